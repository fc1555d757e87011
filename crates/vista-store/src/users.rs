//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use vista_shared::types::Role;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.  Fails with [`StoreError::Duplicate`] when the
    /// email is already registered.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, role, phone,
                                    profile_image, is_verified, is_blocked, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.phone,
                    user.profile_image,
                    user.is_verified,
                    user.is_blocked,
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                let err = StoreError::Sqlite(e);
                if err.is_unique_violation() {
                    StoreError::Duplicate("Email already registered".into())
                } else {
                    err
                }
            })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, name, email, password_hash, role, phone,
                        profile_image, is_verified, is_blocked, created_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a user by email, or `None` when no account exists.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        use rusqlite::OptionalExtension;

        let user = self
            .conn()
            .query_row(
                "SELECT id, name, email, password_hash, role, phone,
                        profile_image, is_verified, is_blocked, created_at
                 FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Partial profile update; `None` fields are left unchanged.
    /// Returns the updated user.
    pub fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users
             SET name          = COALESCE(?2, name),
                 phone         = COALESCE(?3, phone),
                 profile_image = COALESCE(?4, profile_image)
             WHERE id = ?1",
            params![id.to_string(), name, phone, profile_image],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(4)?;
    let created_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let role = Role::from_str(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_str}").into(),
        )
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        phone: row.get(5)?,
        profile_image: row.get(6)?,
        is_verified: row.get(7)?,
        is_blocked: row.get(8)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            role: Role::User,
            phone: "0771234567".into(),
            profile_image: None,
            is_verified: false,
            is_blocked: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let (_dir, db) = test_db();
        let user = sample_user("a@example.com");
        db.create_user(&user).unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.email, "a@example.com");
        assert_eq!(fetched.role, Role::User);
    }

    #[test]
    fn duplicate_email_rejected() {
        let (_dir, db) = test_db();
        db.create_user(&sample_user("dup@example.com")).unwrap();

        let err = db.create_user(&sample_user("dup@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn get_by_email() {
        let (_dir, db) = test_db();
        let user = sample_user("find@example.com");
        db.create_user(&user).unwrap();

        let found = db.get_user_by_email("find@example.com").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(db.get_user_by_email("missing@example.com").unwrap().is_none());
    }

    #[test]
    fn partial_profile_update() {
        let (_dir, db) = test_db();
        let user = sample_user("p@example.com");
        db.create_user(&user).unwrap();

        let updated = db
            .update_user_profile(user.id, Some("New Name"), None, Some("http://img"))
            .unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.phone, user.phone);
        assert_eq!(updated.profile_image.as_deref(), Some("http://img"));
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let (_dir, db) = test_db();
        let err = db
            .update_user_profile(Uuid::new_v4(), Some("x"), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
