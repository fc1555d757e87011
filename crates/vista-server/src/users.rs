//! Account registration, login, and profile handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vista_shared::api::{
    ApiResponse, AuthResponse, FieldError, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UserProfile,
};
use vista_shared::types::Role;
use vista_store::User;

use crate::api::AppState;
use crate::auth::{self, AuthUser};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

/// Public view of a user row (no password hash, no block flag).
pub(crate) fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        phone: user.phone.clone(),
        profile_image: user.profile_image.clone(),
        is_verified: user.is_verified,
        created_at: user.created_at,
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if req.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if !req.email.contains('@') {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
    if req.password.len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters long",
        ));
    }
    if req.role == Role::Admin {
        errors.push(FieldError::new("role", "Role must be either user or owner"));
    }
    if req.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "Phone number is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    validate_registration(&req)?;

    let password_hash = auth::hash_password(&req.password)?;
    let user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        password_hash,
        role: req.role,
        phone: req.phone.trim().to_string(),
        profile_image: None,
        is_verified: false,
        is_blocked: false,
        created_at: Utc::now(),
    };

    let db = state.db.lock().await;
    db.create_user(&user)?;

    let token = auth::create_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    info!(user_id = %user.id, role = user.role.as_str(), "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse {
            user: profile_of(&user),
            token,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let db = state.db.lock().await;

    let user = db
        .get_user_by_email(&req.email.trim().to_lowercase())?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }
    if user.is_blocked {
        return Err(ApiError::Forbidden("Account has been blocked".into()));
    }

    let token = auth::create_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    Ok(Json(ApiResponse::ok(AuthResponse {
        user: profile_of(&user),
        token,
    })))
}

async fn me(auth: AuthUser) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::ok(profile_of(&auth.user)))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let db = state.db.lock().await;
    let updated = db.update_user_profile(
        auth.id(),
        req.name.as_deref(),
        req.phone.as_deref(),
        req.profile_image.as_deref(),
    )?;

    Ok(Json(ApiResponse::ok(profile_of(&updated))))
}
