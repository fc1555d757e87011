//! Listing handlers: browse/filter/paginate, geo search, and the
//! ownership-gated mutations.
//!
//! Query parameters arrive as raw strings and are parsed explicitly:
//! malformed numbers are rejected with field-level 400s rather than
//! silently coerced.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use vista_shared::api::{
    ApiResponse, CreateListingRequest, FieldError, ListingResponse, OwnerSummary, PagedResponse,
    UpdateListingRequest,
};
use vista_shared::types::{Facility, Gender, Role};
use vista_store::listings::ListingFilter;
use vista_store::{Database, Listing};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::ownership::{ensure_owner, AdminOverride};

const LISTING_NOT_FOUND: &str = "Boarding house not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings).post(create_listing))
        .route(
            "/:id",
            get(get_listing).put(update_listing).delete(delete_listing),
        )
        .route("/search/nearby", get(nearby_listings))
        .route("/owner/my-listings", get(my_listings))
}

// ---------------------------------------------------------------------------
// Query parsing
// ---------------------------------------------------------------------------

/// Raw query parameters for `GET /api/boarding`.  Everything is a string so
/// malformed values can be rejected with a field-level error instead of a
/// deserializer rejection.
#[derive(Debug, Default, Deserialize)]
struct ListingQuery {
    gender: Option<String>,
    city: Option<String>,
    #[serde(rename = "minPrice")]
    min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    max_price: Option<String>,
    facilities: Option<String>,
    #[serde(rename = "isVerified")]
    is_verified: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

fn parse_positive_u32(field: &str, raw: &Option<String>, default: u32) -> Result<u32, ApiError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ApiError::invalid_field(
            field,
            "must be a positive integer",
        )),
    }
}

fn parse_i64(field: &str, raw: &Option<String>) -> Result<Option<i64>, ApiError> {
    raw.as_ref()
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::invalid_field(field, "must be an integer"))
        })
        .transpose()
}

fn parse_bool(field: &str, raw: &Option<String>) -> Result<Option<bool>, ApiError> {
    match raw.as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(_) => Err(ApiError::invalid_field(field, "must be 'true' or 'false'")),
    }
}

fn parse_f64(field: &str, raw: &str) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .map_err(|_| ApiError::invalid_field(field, "must be a number"))
}

fn parse_filter(query: &ListingQuery) -> Result<(ListingFilter, u32, u32), ApiError> {
    let gender = query
        .gender
        .as_deref()
        .map(|raw| {
            Gender::from_str(raw)
                .ok_or_else(|| ApiError::invalid_field("gender", "must be 'male' or 'female'"))
        })
        .transpose()?;

    let mut facilities = Vec::new();
    if let Some(raw) = &query.facilities {
        for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let facility = Facility::from_str(tag).ok_or_else(|| {
                ApiError::Validation(vec![FieldError::new(
                    "facilities",
                    format!("unknown facility tag: {tag}"),
                )])
            })?;
            facilities.push(facility);
        }
    }

    let filter = ListingFilter {
        gender,
        city: query.city.clone(),
        min_price: parse_i64("minPrice", &query.min_price)?,
        max_price: parse_i64("maxPrice", &query.max_price)?,
        facilities,
        is_verified: parse_bool("isVerified", &query.is_verified)?,
    };

    let page = parse_positive_u32("page", &query.page, 1)?;
    let limit = parse_positive_u32("limit", &query.limit, 10)?;

    Ok((filter, page, limit))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Listing with the owner contact summary attached.
pub(crate) fn to_response(db: &Database, listing: Listing) -> Result<ListingResponse, ApiError> {
    let owner = db.get_user(listing.owner_id)?;
    Ok(ListingResponse {
        id: listing.id,
        owner: OwnerSummary {
            id: owner.id,
            name: owner.name,
            email: owner.email,
            phone: owner.phone,
        },
        title: listing.title,
        description: listing.description,
        address: listing.address,
        coordinates: listing.coordinates,
        price: listing.price,
        gender: listing.gender,
        facilities: listing.facilities,
        room_types: listing.room_types,
        images: listing.images,
        rules: listing.rules,
        is_available: listing.is_available,
        is_verified: listing.is_verified,
        average_rating: listing.average_rating,
        review_count: listing.review_count,
        created_at: listing.created_at,
    })
}

async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<PagedResponse<ListingResponse>>, ApiError> {
    let (filter, page, limit) = parse_filter(&query)?;

    let db = state.db.lock().await;
    let result = db.list_listings(&filter, page, limit)?;

    let mut items = Vec::with_capacity(result.items.len());
    for listing in result.items {
        items.push(to_response(&db, listing)?);
    }

    Ok(Json(PagedResponse::new(items, result.total, page, limit)))
}

async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let db = state.db.lock().await;
    let listing = db
        .get_listing(id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;

    Ok(Json(ApiResponse::ok(to_response(&db, listing)?)))
}

fn validate_listing(req: &CreateListingRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if req.title.trim().is_empty() {
        errors.push(FieldError::new("title", "Please add a title"));
    }
    if req.description.trim().is_empty() {
        errors.push(FieldError::new("description", "Please add a description"));
    }
    if req.address.street.trim().is_empty() {
        errors.push(FieldError::new("address.street", "Street is required"));
    }
    if req.address.city.trim().is_empty() {
        errors.push(FieldError::new("address.city", "City is required"));
    }
    if req.price.monthly <= 0 {
        errors.push(FieldError::new("price.monthly", "Please add monthly rent"));
    }
    if req.price.deposit < 0 {
        errors.push(FieldError::new("price.deposit", "Deposit cannot be negative"));
    }
    if !(-90.0..=90.0).contains(&req.coordinates.latitude)
        || !(-180.0..=180.0).contains(&req.coordinates.longitude)
    {
        errors.push(FieldError::new("coordinates", "Coordinates out of range"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

async fn create_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ListingResponse>>), ApiError> {
    if !matches!(auth.role(), Role::Owner | Role::Admin) {
        return Err(ApiError::Forbidden(
            "Only owners can create boarding houses. Please register as an owner or contact support."
                .into(),
        ));
    }
    validate_listing(&req)?;

    let listing = Listing {
        id: Uuid::new_v4(),
        owner_id: auth.id(),
        title: req.title.trim().to_string(),
        description: req.description,
        address: req.address,
        coordinates: req.coordinates,
        price: req.price,
        gender: req.gender,
        facilities: req.facilities,
        room_types: req.room_types,
        images: req.images,
        rules: req.rules,
        is_available: true,
        is_verified: false,
        average_rating: 0.0,
        review_count: 0,
        created_at: Utc::now(),
    };

    let db = state.db.lock().await;
    db.create_listing(&listing)?;

    info!(listing_id = %listing.id, owner_id = %listing.owner_id, "listing created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(to_response(&db, listing)?)),
    ))
}

async fn update_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let db = state.db.lock().await;
    let mut listing = db
        .get_listing(id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;

    ensure_owner(
        listing.owner_id,
        &auth,
        AdminOverride::Allow,
        "Not authorized to update this boarding house",
    )?;

    if let Some(title) = req.title {
        listing.title = title;
    }
    if let Some(description) = req.description {
        listing.description = description;
    }
    if let Some(address) = req.address {
        listing.address = address;
    }
    if let Some(coordinates) = req.coordinates {
        listing.coordinates = coordinates;
    }
    if let Some(price) = req.price {
        listing.price = price;
    }
    if let Some(gender) = req.gender {
        listing.gender = gender;
    }
    if let Some(facilities) = req.facilities {
        listing.facilities = facilities;
    }
    if let Some(room_types) = req.room_types {
        listing.room_types = room_types;
    }
    if let Some(images) = req.images {
        listing.images = images;
    }
    if let Some(rules) = req.rules {
        listing.rules = rules;
    }
    if let Some(is_available) = req.is_available {
        listing.is_available = is_available;
    }

    if listing.price.monthly <= 0 {
        return Err(ApiError::invalid_field(
            "price.monthly",
            "Please add monthly rent",
        ));
    }

    db.update_listing(&listing)?;

    info!(listing_id = %listing.id, "listing updated");

    Ok(Json(ApiResponse::ok(to_response(&db, listing)?)))
}

async fn delete_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let db = state.db.lock().await;
    let listing = db
        .get_listing(id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;

    ensure_owner(
        listing.owner_id,
        &auth,
        AdminOverride::Allow,
        "Not authorized to delete this boarding house",
    )?;

    db.delete_listing(id)?;

    info!(listing_id = %id, "listing deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    latitude: Option<String>,
    longitude: Option<String>,
    #[serde(rename = "maxDistance")]
    max_distance: Option<String>,
}

/// Default search radius in meters.
const DEFAULT_NEARBY_RADIUS_M: f64 = 10_000.0;
/// Nearby results are capped like the source system.
const NEARBY_LIMIT: usize = 20;

async fn nearby_listings(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<ListingResponse>>>, ApiError> {
    let (Some(lat_raw), Some(lon_raw)) = (&query.latitude, &query.longitude) else {
        return Err(ApiError::BadRequest(
            "Please provide latitude and longitude".into(),
        ));
    };

    let latitude = parse_f64("latitude", lat_raw)?;
    let longitude = parse_f64("longitude", lon_raw)?;
    let max_distance = query
        .max_distance
        .as_deref()
        .map(|raw| parse_f64("maxDistance", raw))
        .transpose()?
        .unwrap_or(DEFAULT_NEARBY_RADIUS_M);

    let db = state.db.lock().await;
    let nearby = db.nearby_listings(latitude, longitude, max_distance, NEARBY_LIMIT)?;

    let mut items = Vec::with_capacity(nearby.len());
    for (listing, _distance) in nearby {
        items.push(to_response(&db, listing)?);
    }

    Ok(Json(ApiResponse::ok(items)))
}

async fn my_listings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<ListingResponse>>>, ApiError> {
    let db = state.db.lock().await;
    let listings = db.list_listings_by_owner(auth.id())?;

    let mut items = Vec::with_capacity(listings.len());
    for listing in listings {
        items.push(to_response(&db, listing)?);
    }

    Ok(Json(ApiResponse::ok(items)))
}
