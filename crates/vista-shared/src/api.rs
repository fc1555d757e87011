//! Wire-level request/response types for the REST API.
//!
//! Every endpoint speaks the same envelope: `{"success": bool, data?,
//! message?, errors?}`. Paginated list endpoints use [`PagedResponse`],
//! which adds `count`/`total`/`page`/`pages` alongside `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{ChatRole, Facility, Gender, MessageType, Role};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    /// Failure response carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    /// Validation failure carrying field-level errors.
    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            errors: Some(errors),
        }
    }
}

/// Envelope for paginated list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub success: bool,
    /// Number of items on this page.
    pub count: usize,
    /// Total number of items matching the filter.
    pub total: u64,
    /// 1-indexed page number.
    pub page: u32,
    /// Total number of pages: `ceil(total / limit)`.
    pub pages: u32,
    pub data: Vec<T>,
}

impl<T> PagedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            ((total + u64::from(limit) - 1) / u64::from(limit)) as u32
        };
        Self {
            success: true,
            count: data.len(),
            total,
            page,
            pages,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Common value objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Monthly rent and deposit, in whole currency units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Price {
    pub monthly: i64,
    pub deposit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomType {
    pub name: String,
    pub capacity: u32,
    pub available: u32,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

/// Owner contact details embedded in listing responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Minimal user details embedded in review and chat responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile plus a freshly signed bearer token, returned by register/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub address: Address,
    pub coordinates: GeoPoint,
    pub price: Price,
    pub gender: Gender,
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub room_types: Vec<RoomType>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateListingRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub facilities: Option<Vec<Facility>>,
    #[serde(default)]
    pub room_types: Option<Vec<RoomType>>,
    #[serde(default)]
    pub images: Option<Vec<ImageRef>>,
    #[serde(default)]
    pub rules: Option<Vec<String>>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub owner: OwnerSummary,
    pub title: String,
    pub description: String,
    pub address: Address,
    pub coordinates: GeoPoint,
    pub price: Price,
    pub gender: Gender,
    pub facilities: Vec<Facility>,
    pub room_types: Vec<RoomType>,
    pub images: Vec<ImageRef>,
    pub rules: Vec<String>,
    pub is_available: bool,
    pub is_verified: bool,
    pub average_rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub listing_id: Uuid,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    #[serde(default)]
    pub facilities: Option<u8>,
    #[serde(default)]
    pub location: Option<u8>,
    #[serde(default)]
    pub value: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub facilities: Option<u8>,
    #[serde(default)]
    pub location: Option<u8>,
    #[serde(default)]
    pub value: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub listing_title: String,
    pub user: UserSummary,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilities: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics for one listing's reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStats {
    /// Mean rating rounded to one decimal; 0.0 with no reviews.
    pub average_rating: f64,
    pub total_reviews: u64,
    /// Count of reviews per star value, keys 1 through 5.
    pub rating_distribution: BTreeMap<u8, u64>,
}

// ---------------------------------------------------------------------------
// Chats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub listing_id: Uuid,
    pub participant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub file_url: Option<String>,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub user: UserSummary,
    pub role: ChatRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender: UserSummary,
    pub content: String,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One entry in the caller's chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub listing_title: String,
    pub participants: Vec<ChatParticipant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageResponse>,
    /// Messages addressed to the caller that are still unread.
    pub unread_count: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chat with its full message history in append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub listing_title: String,
    pub participants: Vec<ChatParticipant>,
    pub messages: Vec<MessageResponse>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_empty_fields() {
        let resp = ApiResponse::ok(42u32);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("message").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn paged_response_computes_pages() {
        let paged = PagedResponse::new(vec![1, 2, 3], 23, 1, 10);
        assert_eq!(paged.count, 3);
        assert_eq!(paged.total, 23);
        assert_eq!(paged.pages, 3);

        let exact = PagedResponse::<i32>::new(vec![], 20, 1, 10);
        assert_eq!(exact.pages, 2);

        let empty = PagedResponse::<i32>::new(vec![], 0, 1, 10);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn rating_distribution_serializes_with_numeric_keys() {
        let mut dist = BTreeMap::new();
        for star in 1u8..=5 {
            dist.insert(star, 0u64);
        }
        dist.insert(5, 2);
        let stats = ReviewStats {
            average_rating: 5.0,
            total_reviews: 2,
            rating_distribution: dist,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["rating_distribution"]["5"], 2);
    }
}
