//! CRUD operations for [`Review`] records and the rating aggregation that
//! keeps each listing's `average_rating` / `review_count` in sync.
//!
//! Every mutation runs inside a transaction together with the recompute, so
//! the denormalized aggregate can never drift from the reviews table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use uuid::Uuid;

use vista_shared::api::ReviewStats;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Page, Review};

const REVIEW_COLS: &str =
    "id, listing_id, user_id, rating, title, comment, facilities, location, value, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new review and recompute the listing aggregate.
    ///
    /// Fails with [`StoreError::Duplicate`] when the user has already
    /// reviewed this listing; the UNIQUE index backs the explicit check.
    pub fn create_review(&self, review: &Review) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        let already: i64 = tx.query_row(
            "SELECT COUNT(*) FROM reviews WHERE listing_id = ?1 AND user_id = ?2",
            params![review.listing_id.to_string(), review.user_id.to_string()],
            |row| row.get(0),
        )?;
        if already > 0 {
            return Err(StoreError::Duplicate(
                "You have already reviewed this boarding house".into(),
            ));
        }

        tx.execute(
            "INSERT INTO reviews (id, listing_id, user_id, rating, title, comment,
                                  facilities, location, value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                review.id.to_string(),
                review.listing_id.to_string(),
                review.user_id.to_string(),
                review.rating,
                review.title,
                review.comment,
                review.facilities,
                review.location,
                review.value,
                review.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            let err = StoreError::Sqlite(e);
            if err.is_unique_violation() {
                StoreError::Duplicate("You have already reviewed this boarding house".into())
            } else {
                err
            }
        })?;

        recompute_listing_rating(&tx, review.listing_id)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single review by UUID.
    pub fn get_review(&self, id: Uuid) -> Result<Review> {
        self.conn()
            .query_row(
                &format!("SELECT {REVIEW_COLS} FROM reviews WHERE id = ?1"),
                params![id.to_string()],
                row_to_review,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// One page of reviews, newest first, optionally restricted to one
    /// listing.
    pub fn list_reviews(
        &self,
        listing_id: Option<Uuid>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Review>> {
        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);

        let (total, rows_sql, id_param): (i64, String, Option<String>) = match listing_id {
            Some(listing_id) => {
                let id_str = listing_id.to_string();
                let total = self.conn().query_row(
                    "SELECT COUNT(*) FROM reviews WHERE listing_id = ?1",
                    params![id_str],
                    |row| row.get(0),
                )?;
                (
                    total,
                    format!(
                        "SELECT {REVIEW_COLS} FROM reviews WHERE listing_id = ?1
                         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                    ),
                    Some(id_str),
                )
            }
            None => {
                let total = self
                    .conn()
                    .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
                (
                    total,
                    format!(
                        "SELECT {REVIEW_COLS} FROM reviews
                         ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                    ),
                    None,
                )
            }
        };

        let mut stmt = self.conn().prepare(&rows_sql)?;
        let mut items = Vec::new();
        match id_param {
            Some(id_str) => {
                let rows =
                    stmt.query_map(params![id_str, limit, offset as i64], row_to_review)?;
                for row in rows {
                    items.push(row?);
                }
            }
            None => {
                let rows = stmt.query_map(params![limit, offset as i64], row_to_review)?;
                for row in rows {
                    items.push(row?);
                }
            }
        }

        Ok(Page {
            items,
            total: total as u64,
        })
    }

    /// Aggregate statistics for one listing: mean rating, total count, and
    /// the per-star distribution.
    pub fn review_stats(&self, listing_id: Uuid) -> Result<ReviewStats> {
        let mut distribution: BTreeMap<u8, u64> = (1..=5u8).map(|star| (star, 0)).collect();

        let mut stmt = self.conn().prepare(
            "SELECT rating, COUNT(*) FROM reviews WHERE listing_id = ?1 GROUP BY rating",
        )?;
        let rows = stmt.query_map(params![listing_id.to_string()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut total: u64 = 0;
        let mut sum: i64 = 0;
        for row in rows {
            let (rating, count) = row?;
            total += count as u64;
            sum += rating * count;
            if let Some(slot) = distribution.get_mut(&(rating as u8)) {
                *slot = count as u64;
            }
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            round_one_decimal(sum as f64 / total as f64)
        };

        Ok(ReviewStats {
            average_rating,
            total_reviews: total,
            rating_distribution: distribution,
        })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite a review's rating, text, and sub-ratings, then recompute
    /// the listing aggregate.
    pub fn update_review(&self, review: &Review) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        let affected = tx.execute(
            "UPDATE reviews
             SET rating = ?2, title = ?3, comment = ?4,
                 facilities = ?5, location = ?6, value = ?7
             WHERE id = ?1",
            params![
                review.id.to_string(),
                review.rating,
                review.title,
                review.comment,
                review.facilities,
                review.location,
                review.value,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        recompute_listing_rating(&tx, review.listing_id)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a review and recompute the listing aggregate.
    /// Returns `true` if a row was deleted.
    pub fn delete_review(&self, id: Uuid) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;

        let listing_id: Option<String> = tx
            .query_row(
                "SELECT listing_id FROM reviews WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(listing_id) = listing_id else {
            return Ok(false);
        };
        let listing_id = Uuid::parse_str(&listing_id)?;

        tx.execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])?;
        recompute_listing_rating(&tx, listing_id)?;
        tx.commit()?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Recompute and store a listing's `average_rating` / `review_count` from
/// its reviews.  The mean is rounded to one decimal; zero reviews resets
/// the aggregate to (0.0, 0).
fn recompute_listing_rating(conn: &Connection, listing_id: Uuid) -> Result<()> {
    let (avg, count): (Option<f64>, i64) = conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE listing_id = ?1",
        params![listing_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let average = avg.map(round_one_decimal).unwrap_or(0.0);

    conn.execute(
        "UPDATE listings SET average_rating = ?2, review_count = ?3 WHERE id = ?1",
        params![listing_id.to_string(), average, count],
    )?;

    tracing::debug!(
        listing_id = %listing_id,
        average_rating = average,
        review_count = count,
        "recomputed listing rating"
    );
    Ok(())
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Map a `rusqlite::Row` to a [`Review`].
fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    let id_str: String = row.get(0)?;
    let listing_str: String = row.get(1)?;
    let user_str: String = row.get(2)?;
    let created_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let listing_id = Uuid::parse_str(&listing_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_id = Uuid::parse_str(&user_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Review {
        id,
        listing_id,
        user_id,
        rating: row.get::<_, i64>(3)? as u8,
        title: row.get(4)?,
        comment: row.get(5)?,
        facilities: row.get::<_, Option<i64>>(6)?.map(|v| v as u8),
        location: row.get::<_, Option<i64>>(7)?.map(|v| v as u8),
        value: row.get::<_, Option<i64>>(8)?.map(|v| v as u8),
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
                monthly: 30_000,
                deposit: 0,
            },
            gender: Gender::Male,
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

    fn review(listing_id: Uuid, user_id: Uuid, rating: u8) -> Review {
        Review {
            id: Uuid::new_v4(),
            listing_id,
            user_id,
            rating,
            title: "T".into(),
            comment: "C".into(),
            facilities: None,
            location: None,
            value: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn aggregate_follows_create_and_delete() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);

        let mut review_ids = Vec::new();
        for rating in [5u8, 4, 3] {
            let reviewer = user(&db, Role::User);
            let r = review(listing_id, reviewer, rating);
            review_ids.push((r.id, rating));
            db.create_review(&r).unwrap();
        }

        let l = db.get_listing(listing_id).unwrap();
        assert_eq!(l.average_rating, 4.0);
        assert_eq!(l.review_count, 3);

        let (id_of_three, _) = review_ids
            .iter()
            .find(|(_, rating)| *rating == 3)
            .copied()
            .unwrap();
        assert!(db.delete_review(id_of_three).unwrap());

        let l = db.get_listing(listing_id).unwrap();
        assert_eq!(l.average_rating, 4.5);
        assert_eq!(l.review_count, 2);
    }

    #[test]
    fn aggregate_resets_when_last_review_deleted() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);
        let reviewer = user(&db, Role::User);

        let r = review(listing_id, reviewer, 5);
        db.create_review(&r).unwrap();
        assert_eq!(db.get_listing(listing_id).unwrap().average_rating, 5.0);

        db.delete_review(r.id).unwrap();
        let l = db.get_listing(listing_id).unwrap();
        assert_eq!(l.average_rating, 0.0);
        assert_eq!(l.review_count, 0);
    }

    #[test]
    fn second_review_by_same_user_rejected() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);
        let reviewer = user(&db, Role::User);

        db.create_review(&review(listing_id, reviewer, 5)).unwrap();
        let err = db
            .create_review(&review(listing_id, reviewer, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // The rejected insert must not have touched the aggregate.
        let l = db.get_listing(listing_id).unwrap();
        assert_eq!(l.average_rating, 5.0);
        assert_eq!(l.review_count, 1);
    }

    #[test]
    fn rating_update_recomputes() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);
        let reviewer = user(&db, Role::User);

        let mut r = review(listing_id, reviewer, 2);
        db.create_review(&r).unwrap();

        r.rating = 4;
        db.update_review(&r).unwrap();

        let l = db.get_listing(listing_id).unwrap();
        assert_eq!(l.average_rating, 4.0);
        assert_eq!(l.review_count, 1);
    }

    #[test]
    fn rounding_is_one_decimal() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);

        // 5, 4, 4 -> mean 4.333... -> 4.3
        for rating in [5u8, 4, 4] {
            let reviewer = user(&db, Role::User);
            db.create_review(&review(listing_id, reviewer, rating))
                .unwrap();
        }
        assert_eq!(db.get_listing(listing_id).unwrap().average_rating, 4.3);
    }

    #[test]
    fn stats_distribution() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);

        for rating in [5u8, 5, 3] {
            let reviewer = user(&db, Role::User);
            db.create_review(&review(listing_id, reviewer, rating))
                .unwrap();
        }

        let stats = db.review_stats(listing_id).unwrap();
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.average_rating, 4.3);
        assert_eq!(stats.rating_distribution[&5], 2);
        assert_eq!(stats.rating_distribution[&3], 1);
        assert_eq!(stats.rating_distribution[&1], 0);
    }

    #[test]
    fn empty_stats() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let listing_id = listing(&db, owner_id);

        let stats = db.review_stats(listing_id).unwrap();
        assert_eq!(stats.total_reviews, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.rating_distribution.len(), 5);
    }

    #[test]
    fn list_filters_by_listing() {
        let (_dir, db) = test_db();
        let owner_id = user(&db, Role::Owner);
        let l1 = listing(&db, owner_id);
        let l2 = listing(&db, owner_id);

        for _ in 0..3 {
            let reviewer = user(&db, Role::User);
            db.create_review(&review(l1, reviewer, 5)).unwrap();
        }
        let reviewer = user(&db, Role::User);
        db.create_review(&review(l2, reviewer, 2)).unwrap();

        assert_eq!(db.list_reviews(Some(l1), 1, 10).unwrap().total, 3);
        assert_eq!(db.list_reviews(Some(l2), 1, 10).unwrap().total, 1);
        assert_eq!(db.list_reviews(None, 1, 2).unwrap().items.len(), 2);
        assert_eq!(db.list_reviews(None, 1, 2).unwrap().total, 4);
    }
}
