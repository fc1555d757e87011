//! CRUD operations for [`Chat`] threads and their [`Message`] rows.
//!
//! Messages are append-only and keyed by chat id.  Append order is the
//! insertion order: the history query orders by `created_at` with the
//! SQLite rowid as the tie-break, so messages written within the same
//! millisecond still come back in the order they were sent.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use vista_shared::types::MessageType;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Chat, Message};

const CHAT_COLS: &str =
    "id, listing_id, owner_id, tenant_id, last_message, is_active, created_at, updated_at";

const MESSAGE_COLS: &str =
    "id, chat_id, sender_id, content, message_type, file_url, is_read, read_at, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new chat thread.
    pub fn create_chat(&self, chat: &Chat) -> Result<()> {
        self.conn().execute(
            "INSERT INTO chats (id, listing_id, owner_id, tenant_id, last_message,
                                is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                chat.id.to_string(),
                chat.listing_id.to_string(),
                chat.owner_id.to_string(),
                chat.tenant_id.to_string(),
                chat.last_message
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                chat.is_active,
                chat.created_at.to_rfc3339(),
                chat.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single chat by UUID.
    pub fn get_chat(&self, id: Uuid) -> Result<Chat> {
        self.conn()
            .query_row(
                &format!("SELECT {CHAT_COLS} FROM chats WHERE id = ?1"),
                params![id.to_string()],
                row_to_chat,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Find the chat between two users about one listing, regardless of
    /// which side created it.
    pub fn find_chat(&self, listing_id: Uuid, a: Uuid, b: Uuid) -> Result<Option<Chat>> {
        let chat = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CHAT_COLS} FROM chats
                     WHERE listing_id = ?1
                       AND ((owner_id = ?2 AND tenant_id = ?3)
                         OR (owner_id = ?3 AND tenant_id = ?2))"
                ),
                params![listing_id.to_string(), a.to_string(), b.to_string()],
                row_to_chat,
            )
            .optional()?;
        Ok(chat)
    }

    /// All chats the user participates in, most recently active first.
    pub fn list_chats_for_user(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CHAT_COLS} FROM chats
             WHERE owner_id = ?1 OR tenant_id = ?1
             ORDER BY updated_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_chat)?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(row?);
        }
        Ok(chats)
    }

    /// Full message history for a chat, in append order.
    pub fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM messages
             WHERE chat_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![chat_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Messages in `chat_id` addressed to `user_id` (i.e. sent by the other
    /// side) that are still unread.
    pub fn unread_count(&self, chat_id: Uuid, user_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![chat_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Append a message to its chat, overwrite the denormalized
    /// last-message copy, and bump the chat's `updated_at`.
    pub fn append_message(&self, message: &Message) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO messages (id, chat_id, sender_id, content, message_type,
                                   file_url, is_read, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id.to_string(),
                message.chat_id.to_string(),
                message.sender_id.to_string(),
                message.content,
                message.message_type.as_str(),
                message.file_url,
                message.is_read,
                message.read_at.map(|t| t.to_rfc3339()),
                message.created_at.to_rfc3339(),
            ],
        )?;

        let affected = tx.execute(
            "UPDATE chats SET last_message = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                message.chat_id.to_string(),
                serde_json::to_string(message)?,
                message.created_at.to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit()?;
        Ok(())
    }

    /// Mark every message in `chat_id` not authored by `user_id` as read.
    /// Returns the number of messages flipped.
    pub fn mark_messages_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64> {
        let affected = self.conn().execute(
            "UPDATE messages
             SET is_read = 1, read_at = ?3
             WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![
                chat_id.to_string(),
                user_id.to_string(),
                read_at.to_rfc3339(),
            ],
        )?;
        Ok(affected as u64)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Chat`].
fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let id_str: String = row.get(0)?;
    let listing_str: String = row.get(1)?;
    let owner_str: String = row.get(2)?;
    let tenant_str: String = row.get(3)?;
    let last_message_json: Option<String> = row.get(4)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    let parse_uuid = |idx: usize, s: &str| {
        Uuid::parse_str(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    };

    let last_message = last_message_json
        .map(|json| serde_json::from_str::<Message>(&json))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let parse_ts = |idx: usize, s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    };

    Ok(Chat {
        id: parse_uuid(0, &id_str)?,
        listing_id: parse_uuid(1, &listing_str)?,
        owner_id: parse_uuid(2, &owner_str)?,
        tenant_id: parse_uuid(3, &tenant_str)?,
        last_message,
        is_active: row.get(5)?,
        created_at: parse_ts(6, &created_str)?,
        updated_at: parse_ts(7, &updated_str)?,
    })
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let chat_str: String = row.get(1)?;
    let sender_str: String = row.get(2)?;
    let type_str: String = row.get(4)?;
    let read_at_str: Option<String> = row.get(7)?;
    let created_str: String = row.get(8)?;

    let parse_uuid = |idx: usize, s: &str| {
        Uuid::parse_str(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    };

    let message_type = MessageType::from_str(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown message type: {type_str}").into(),
        )
    })?;

    let read_at = read_at_str
        .map(|s| {
            DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc))
        })
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id: parse_uuid(0, &id_str)?,
        chat_id: parse_uuid(1, &chat_str)?,
        sender_id: parse_uuid(2, &sender_str)?,
        content: row.get(3)?,
        message_type,
        file_url: row.get(5)?,
        is_read: row.get(6)?,
        read_at,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Listing, User};
    use vista_shared::api::{Address, GeoPoint, Price};
    use vista_shared::types::{Gender, Role};

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn user(db: &Database, role: Role) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: "U".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".into(),
            role,
            phone: "077".into(),
            profile_image: None,
            is_verified: false,
            is_blocked: false,
            created_at: Utc::now(),
        };
        db.create_user(&user).unwrap();
        user.id
    }

    fn listing(db: &Database, owner_id: Uuid) -> Uuid {
        let listing = Listing {
            id: Uuid::new_v4(),
            owner_id,
            title: "L".into(),
            description: "D".into(),
            address: Address {
                street: "s".into(),
                city: "c".into(),
                state: "".into(),
                zip_code: None,
            },
            coordinates: GeoPoint {
                latitude: 0.0,
                longitude: 0.0,
            },
            price: Price {
                monthly: 1,
                deposit: 0,
            },
            gender: Gender::Female,
            facilities: vec![],
            room_types: vec![],
            images: vec![],
            rules: vec![],
            is_available: true,
            is_verified: false,
            average_rating: 0.0,
            review_count: 0,
            created_at: Utc::now(),
        };
        db.create_listing(&listing).unwrap();
        listing.id
    }

    fn chat(db: &Database) -> (Chat, Uuid, Uuid) {
        let owner_id = user(db, Role::Owner);
        let tenant_id = user(db, Role::User);
        let listing_id = listing(db, owner_id);
        let chat = Chat {
            id: Uuid::new_v4(),
            listing_id,
            owner_id,
            tenant_id,
            last_message: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.create_chat(&chat).unwrap();
        (chat, owner_id, tenant_id)
    }

    fn message(chat_id: Uuid, sender_id: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            content: content.into(),
            message_type: MessageType::Text,
            file_url: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn find_chat_matches_either_role_order() {
        let (_dir, db) = test_db();
        let (chat, owner_id, tenant_id) = chat(&db);

        let found = db.find_chat(chat.listing_id, owner_id, tenant_id).unwrap();
        assert_eq!(found.map(|c| c.id), Some(chat.id));

        let reversed = db.find_chat(chat.listing_id, tenant_id, owner_id).unwrap();
        assert_eq!(reversed.map(|c| c.id), Some(chat.id));

        let stranger = user(&db, Role::User);
        assert!(db
            .find_chat(chat.listing_id, owner_id, stranger)
            .unwrap()
            .is_none());
    }

    #[test]
    fn messages_come_back_in_append_order() {
        let (_dir, db) = test_db();
        let (chat, owner_id, tenant_id) = chat(&db);

        // Same timestamp for all three: the rowid tie-break keeps order.
        let now = Utc::now();
        let contents = ["first", "second", "third"];
        for (i, content) in contents.iter().enumerate() {
            let sender = if i % 2 == 0 { tenant_id } else { owner_id };
            let mut m = message(chat.id, sender, content);
            m.created_at = now;
            db.append_message(&m).unwrap();
        }

        let history = db.list_messages(chat.id).unwrap();
        let got: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(got, contents);
    }

    #[test]
    fn append_updates_last_message_and_activity() {
        let (_dir, db) = test_db();
        let (chat, _owner_id, tenant_id) = chat(&db);

        let m = message(chat.id, tenant_id, "hello");
        db.append_message(&m).unwrap();

        let fetched = db.get_chat(chat.id).unwrap();
        let last = fetched.last_message.expect("last message should be set");
        assert_eq!(last.id, m.id);
        assert_eq!(fetched.updated_at, m.created_at);
    }

    #[test]
    fn append_to_missing_chat_fails() {
        let (_dir, db) = test_db();
        let (_chat, _owner_id, tenant_id) = chat(&db);

        let m = message(Uuid::new_v4(), tenant_id, "ghost");
        assert!(db.append_message(&m).is_err());
    }

    #[test]
    fn mark_read_flips_only_other_senders() {
        let (_dir, db) = test_db();
        let (chat, owner_id, tenant_id) = chat(&db);

        db.append_message(&message(chat.id, tenant_id, "from tenant"))
            .unwrap();
        db.append_message(&message(chat.id, owner_id, "from owner"))
            .unwrap();

        assert_eq!(db.unread_count(chat.id, owner_id).unwrap(), 1);
        assert_eq!(db.unread_count(chat.id, tenant_id).unwrap(), 1);

        let flipped = db
            .mark_messages_read(chat.id, owner_id, Utc::now())
            .unwrap();
        assert_eq!(flipped, 1);

        let history = db.list_messages(chat.id).unwrap();
        let tenant_msg = history.iter().find(|m| m.sender_id == tenant_id).unwrap();
        let owner_msg = history.iter().find(|m| m.sender_id == owner_id).unwrap();
        assert!(tenant_msg.is_read);
        assert!(tenant_msg.read_at.is_some());
        assert!(!owner_msg.is_read);

        assert_eq!(db.unread_count(chat.id, owner_id).unwrap(), 0);
    }

    #[test]
    fn chat_list_ordered_by_activity() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let tenant_id = user(&db, Role::User);
        let l1 = listing(&db, owner_id);
        let l2 = listing(&db, owner_id);

        let older = Utc::now() - chrono::Duration::hours(1);
        let c1 = Chat {
            id: Uuid::new_v4(),
            listing_id: l1,
            owner_id,
            tenant_id,
            last_message: None,
            is_active: true,
            created_at: older,
            updated_at: older,
        };
        db.create_chat(&c1).unwrap();

        let c2 = Chat {
            id: Uuid::new_v4(),
            listing_id: l2,
            owner_id,
            tenant_id,
            last_message: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.create_chat(&c2).unwrap();

        let chats = db.list_chats_for_user(tenant_id).unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, c2.id);

        // Activity on the older chat moves it to the front.
        db.append_message(&message(c1.id, tenant_id, "bump")).unwrap();
        let chats = db.list_chats_for_user(tenant_id).unwrap();
        assert_eq!(chats[0].id, c1.id);

        let stranger = user(&db, Role::User);
        assert!(db.list_chats_for_user(stranger).unwrap().is_empty());
    }
}
