//! CRUD and query operations for [`Listing`] records.
//!
//! The list query translates every filter into SQL so that the total count
//! and the page window come from the same WHERE clause.  Facility filtering
//! uses the JSON1 `json_each` table-valued function over the JSON-encoded
//! facility column: one EXISTS subquery per requested tag, AND-combined.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use uuid::Uuid;

use vista_shared::api::{Address, GeoPoint, Price};
use vista_shared::types::{Facility, Gender};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Listing, Page};

/// Filters accepted by [`Database::list_listings`].  All optional,
/// AND-combined.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Exact gender restriction.
    pub gender: Option<Gender>,
    /// Case-insensitive substring match on the address city.
    pub city: Option<String>,
    /// Inclusive lower bound on monthly rent.
    pub min_price: Option<i64>,
    /// Inclusive upper bound on monthly rent.
    pub max_price: Option<i64>,
    /// The listing must carry every requested tag.
    pub facilities: Vec<Facility>,
    /// Exact verification flag.
    pub is_verified: Option<bool>,
}

const LISTING_COLS: &str = "id, owner_id, title, description, street, city, state, zip_code,
    latitude, longitude, monthly, deposit, gender, facilities, room_types,
    images, rules, is_available, is_verified, average_rating, review_count, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new listing.
    pub fn create_listing(&self, listing: &Listing) -> Result<()> {
        self.conn().execute(
            "INSERT INTO listings (id, owner_id, title, description, street, city, state,
                                   zip_code, latitude, longitude, monthly, deposit, gender,
                                   facilities, room_types, images, rules, is_available,
                                   is_verified, average_rating, review_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                listing.id.to_string(),
                listing.owner_id.to_string(),
                listing.title,
                listing.description,
                listing.address.street,
                listing.address.city,
                listing.address.state,
                listing.address.zip_code,
                listing.coordinates.latitude,
                listing.coordinates.longitude,
                listing.price.monthly,
                listing.price.deposit,
                listing.gender.as_str(),
                serde_json::to_string(&listing.facilities)?,
                serde_json::to_string(&listing.room_types)?,
                serde_json::to_string(&listing.images)?,
                serde_json::to_string(&listing.rules)?,
                listing.is_available,
                listing.is_verified,
                listing.average_rating,
                listing.review_count,
                listing.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single listing by UUID.
    pub fn get_listing(&self, id: Uuid) -> Result<Listing> {
        self.conn()
            .query_row(
                &format!("SELECT {LISTING_COLS} FROM listings WHERE id = ?1"),
                params![id.to_string()],
                row_to_listing,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// One page of listings matching `filter`, newest first.
    ///
    /// `page` is 1-indexed; `limit` is the page size.  Ordering is
    /// `created_at DESC` with `id DESC` as the tie-break so consecutive
    /// pages partition the result set even when timestamps collide.
    pub fn list_listings(
        &self,
        filter: &ListingFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<Listing>> {
        let (where_sql, mut values) = filter_clauses(filter);

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM listings{where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
        values.push(Value::from(i64::from(limit)));
        let limit_idx = values.len();
        values.push(Value::from(offset as i64));
        let offset_idx = values.len();

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LISTING_COLS} FROM listings{where_sql}
             ORDER BY created_at DESC, id DESC
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        ))?;

        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_listing)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(Page {
            items,
            total: total as u64,
        })
    }

    /// All listings owned by `owner_id`, newest first.
    pub fn list_listings_by_owner(&self, owner_id: Uuid) -> Result<Vec<Listing>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LISTING_COLS} FROM listings
             WHERE owner_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map(params![owner_id.to_string()], row_to_listing)?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }

    /// Available listings within `max_distance_m` meters of the given point,
    /// nearest first, capped at `limit` results.  Returns each listing with
    /// its distance in meters.
    pub fn nearby_listings(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance_m: f64,
        limit: usize,
    ) -> Result<Vec<(Listing, f64)>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LISTING_COLS} FROM listings WHERE is_available = 1"
        ))?;

        let rows = stmt.query_map([], row_to_listing)?;

        let mut nearby = Vec::new();
        for row in rows {
            let listing = row?;
            let distance = haversine_m(
                latitude,
                longitude,
                listing.coordinates.latitude,
                listing.coordinates.longitude,
            );
            if distance <= max_distance_m {
                nearby.push((listing, distance));
            }
        }

        nearby.sort_by(|a, b| a.1.total_cmp(&b.1));
        nearby.truncate(limit);
        Ok(nearby)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the mutable fields of a listing.  The owner, the creation
    /// timestamp, and the denormalized rating aggregate are not touched.
    pub fn update_listing(&self, listing: &Listing) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE listings
             SET title = ?2, description = ?3, street = ?4, city = ?5, state = ?6,
                 zip_code = ?7, latitude = ?8, longitude = ?9, monthly = ?10,
                 deposit = ?11, gender = ?12, facilities = ?13, room_types = ?14,
                 images = ?15, rules = ?16, is_available = ?17
             WHERE id = ?1",
            params![
                listing.id.to_string(),
                listing.title,
                listing.description,
                listing.address.street,
                listing.address.city,
                listing.address.state,
                listing.address.zip_code,
                listing.coordinates.latitude,
                listing.coordinates.longitude,
                listing.price.monthly,
                listing.price.deposit,
                listing.gender.as_str(),
                serde_json::to_string(&listing.facilities)?,
                serde_json::to_string(&listing.room_types)?,
                serde_json::to_string(&listing.images)?,
                serde_json::to_string(&listing.rules)?,
                listing.is_available,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a listing by UUID.  Reviews, chats, and messages cascade.
    /// Returns `true` if a row was deleted.
    pub fn delete_listing(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM listings WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the WHERE clause and positional parameters for `filter`.
fn filter_clauses(filter: &ListingFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(gender) = filter.gender {
        values.push(Value::from(gender.as_str().to_string()));
        clauses.push(format!("gender = ?{}", values.len()));
    }

    if let Some(city) = &filter.city {
        values.push(Value::from(format!("%{}%", city.to_lowercase())));
        clauses.push(format!("lower(city) LIKE ?{}", values.len()));
    }

    if let Some(min) = filter.min_price {
        values.push(Value::from(min));
        clauses.push(format!("monthly >= ?{}", values.len()));
    }

    if let Some(max) = filter.max_price {
        values.push(Value::from(max));
        clauses.push(format!("monthly <= ?{}", values.len()));
    }

    // The listing must contain every requested tag.
    for facility in &filter.facilities {
        values.push(Value::from(facility.as_str().to_string()));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(listings.facilities)
                     WHERE json_each.value = ?{})",
            values.len()
        ));
    }

    if let Some(verified) = filter.is_verified {
        values.push(Value::from(verified));
        clauses.push(format!("is_verified = ?{}", values.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

/// Great-circle distance in meters between two WGS84 points.
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Map a `rusqlite::Row` to a [`Listing`].
fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let gender_str: String = row.get(12)?;
    let facilities_json: String = row.get(13)?;
    let room_types_json: String = row.get(14)?;
    let images_json: String = row.get(15)?;
    let rules_json: String = row.get(16)?;
    let created_str: String = row.get(21)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let owner_id = Uuid::parse_str(&owner_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let gender = Gender::from_str(&gender_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            12,
            rusqlite::types::Type::Text,
            format!("unknown gender: {gender_str}").into(),
        )
    })?;

    let facilities: Vec<Facility> = serde_json::from_str(&facilities_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let room_types = serde_json::from_str(&room_types_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let images = serde_json::from_str(&images_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(15, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let rules = serde_json::from_str(&rules_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(16, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(21, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Listing {
        id,
        owner_id,
        title: row.get(2)?,
        description: row.get(3)?,
        address: Address {
            street: row.get(4)?,
            city: row.get(5)?,
            state: row.get(6)?,
            zip_code: row.get(7)?,
        },
        coordinates: GeoPoint {
            latitude: row.get(8)?,
            longitude: row.get(9)?,
        },
        price: Price {
            monthly: row.get(10)?,
            deposit: row.get(11)?,
        },
        gender,
        facilities,
        room_types,
        images,
        rules,
        is_available: row.get(17)?,
        is_verified: row.get(18)?,
        average_rating: row.get(19)?,
        review_count: row.get::<_, i64>(20)? as u32,
        created_at,
    })
}
