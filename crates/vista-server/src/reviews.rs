//! Review handlers and the aggregate statistics endpoint.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use vista_shared::api::{
    ApiResponse, CreateReviewRequest, FieldError, PagedResponse, ReviewResponse, ReviewStats,
    UpdateReviewRequest, UserSummary,
};
use vista_store::{Database, Review};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::ownership::{ensure_owner, AdminOverride};

const LISTING_NOT_FOUND: &str = "Boarding house not found";
const REVIEW_NOT_FOUND: &str = "Review not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/:id", put(update_review).delete(delete_review))
        .route("/stats/:listing_id", get(review_stats))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_response(db: &Database, review: Review) -> Result<ReviewResponse, ApiError> {
    let user = db.get_user(review.user_id)?;
    let listing = db.get_listing(review.listing_id)?;

    Ok(ReviewResponse {
        id: review.id,
        listing_id: review.listing_id,
        listing_title: listing.title,
        user: UserSummary {
            id: user.id,
            name: user.name,
            profile_image: user.profile_image,
        },
        rating: review.rating,
        title: review.title,
        comment: review.comment,
        facilities: review.facilities,
        location: review.location,
        value: review.value,
        created_at: review.created_at,
    })
}

fn valid_rating(value: u8) -> bool {
    (1..=5).contains(&value)
}

fn validate_review(
    rating: u8,
    title: &str,
    comment: &str,
    sub_ratings: [(&str, Option<u8>); 3],
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if !valid_rating(rating) {
        errors.push(FieldError::new(
            "rating",
            "Please provide a rating between 1 and 5",
        ));
    }
    if title.trim().is_empty() {
        errors.push(FieldError::new("title", "Please add a review title"));
    } else if title.len() > 100 {
        errors.push(FieldError::new(
            "title",
            "Title cannot be more than 100 characters",
        ));
    }
    if comment.trim().is_empty() {
        errors.push(FieldError::new("comment", "Please add a review comment"));
    } else if comment.len() > 500 {
        errors.push(FieldError::new(
            "comment",
            "Comment cannot be more than 500 characters",
        ));
    }
    for (field, value) in sub_ratings {
        if let Some(value) = value {
            if !valid_rating(value) {
                errors.push(FieldError::new(field, "Sub-rating must be between 1 and 5"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ReviewQuery {
    #[serde(rename = "listingId")]
    listing_id: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<PagedResponse<ReviewResponse>>, ApiError> {
    let listing_id = query
        .listing_id
        .as_deref()
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::invalid_field("listingId", "must be a valid id"))
        })
        .transpose()?;

    let page = match &query.page {
        None => 1,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ApiError::invalid_field("page", "must be a positive integer"))?,
    };
    let limit = match &query.limit {
        None => 10,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ApiError::invalid_field("limit", "must be a positive integer"))?,
    };

    let db = state.db.lock().await;
    let result = db.list_reviews(listing_id, page, limit)?;

    let mut items = Vec::with_capacity(result.items.len());
    for review in result.items {
        items.push(to_response(&db, review)?);
    }

    Ok(Json(PagedResponse::new(items, result.total, page, limit)))
}

async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    validate_review(
        req.rating,
        &req.title,
        &req.comment,
        [
            ("facilities", req.facilities),
            ("location", req.location),
            ("value", req.value),
        ],
    )?;

    let db = state.db.lock().await;

    // 404 before the duplicate check, like the source system.
    db.get_listing(req.listing_id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;

    let review = Review {
        id: Uuid::new_v4(),
        listing_id: req.listing_id,
        user_id: auth.id(),
        rating: req.rating,
        title: req.title.trim().to_string(),
        comment: req.comment.trim().to_string(),
        facilities: req.facilities,
        location: req.location,
        value: req.value,
        created_at: Utc::now(),
    };

    db.create_review(&review)?;

    info!(review_id = %review.id, listing_id = %review.listing_id, "review created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(to_response(&db, review)?)),
    ))
}

async fn update_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let db = state.db.lock().await;
    let mut review = db
        .get_review(id)
        .map_err(|e| ApiError::from_store(e, REVIEW_NOT_FOUND))?;

    // Reviews have no admin escape hatch; only the author may touch them.
    ensure_owner(
        review.user_id,
        &auth,
        AdminOverride::Deny,
        "Not authorized to update this review",
    )?;

    if let Some(rating) = req.rating {
        review.rating = rating;
    }
    if let Some(title) = req.title {
        review.title = title;
    }
    if let Some(comment) = req.comment {
        review.comment = comment;
    }
    if req.facilities.is_some() {
        review.facilities = req.facilities;
    }
    if req.location.is_some() {
        review.location = req.location;
    }
    if req.value.is_some() {
        review.value = req.value;
    }

    validate_review(
        review.rating,
        &review.title,
        &review.comment,
        [
            ("facilities", review.facilities),
            ("location", review.location),
            ("value", review.value),
        ],
    )?;

    db.update_review(&review)?;

    info!(review_id = %review.id, "review updated");

    Ok(Json(ApiResponse::ok(to_response(&db, review)?)))
}

async fn delete_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let db = state.db.lock().await;
    let review = db
        .get_review(id)
        .map_err(|e| ApiError::from_store(e, REVIEW_NOT_FOUND))?;

    ensure_owner(
        review.user_id,
        &auth,
        AdminOverride::Deny,
        "Not authorized to delete this review",
    )?;

    db.delete_review(id)?;

    info!(review_id = %id, "review deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}

async fn review_stats(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReviewStats>>, ApiError> {
    let db = state.db.lock().await;

    db.get_listing(listing_id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;

    let stats = db.review_stats(listing_id)?;
    Ok(Json(ApiResponse::ok(stats)))
}
