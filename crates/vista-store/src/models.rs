//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be mapped
//! straight onto the wire DTOs in `vista-shared`.  Set-valued listing fields
//! (facilities, room types, images, rules) are stored as JSON columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vista_shared::api::{Address, GeoPoint, ImageRef, Price, RoomType};
use vista_shared::types::{Facility, Gender, MessageType, Role};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    pub name: String,
    /// Unique across all users.
    pub email: String,
    /// Argon2id hash in PHC string format; never leaves the store layer.
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    /// Blocked accounts fail authentication even with a valid token.
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// A boarding-house record with price, facilities, and room inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Unique listing identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub address: Address,
    pub coordinates: GeoPoint,
    pub price: Price,
    pub gender: Gender,
    /// Facility tag set; insertion order is preserved.
    pub facilities: Vec<Facility>,
    pub room_types: Vec<RoomType>,
    pub images: Vec<ImageRef>,
    pub rules: Vec<String>,
    pub is_available: bool,
    pub is_verified: bool,
    /// Mean of all review ratings, rounded to one decimal.  Kept in sync
    /// with the reviews table by the aggregation transaction.
    pub average_rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// A single user's rating of a listing.  At most one per (user, listing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    /// Overall rating, 1 through 5.
    pub rating: u8,
    pub title: String,
    pub comment: String,
    /// Optional sub-ratings, 1 through 5 each.
    pub facilities: Option<u8>,
    pub location: Option<u8>,
    pub value: Option<u8>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A two-participant, listing-scoped message thread.
///
/// The participants are tagged by column: `owner_id` is the listing side,
/// `tenant_id` the inquiring side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub owner_id: Uuid,
    pub tenant_id: Uuid,
    /// Denormalized copy of the most recent message.
    pub last_message: Option<Message>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Whether `user_id` is one of the two participants.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.tenant_id == user_id
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Rows are append-only: messages are never edited
/// or removed individually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// One page of a filtered query plus the total match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
