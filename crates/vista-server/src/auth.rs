//! Bearer-token authentication and password hashing.
//!
//! Tokens are HS256 JWTs carrying the user id and role.  Every
//! authenticated request resolves the claim back to a live user row, so
//! deleted or blocked accounts are rejected even while their token is
//! still within its lifetime.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use vista_shared::types::Role;
use vista_store::User;

use crate::api::AppState;
use crate::error::ApiError;

const AUTH_REQUIRED: &str = "Not authorized to access this route";

/// JWT claim set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// User role at signing time (informational; the live row decides).
    pub role: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Sign a token for `user`.
pub fn create_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token signing failed: {e}")))
}

/// Verify a token's signature and expiry.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized(AUTH_REQUIRED.into()))
}

/// Hash a password with Argon2id, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

/// Check a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// The authenticated caller, resolved to a live user row.
///
/// Used as an axum extractor: any handler taking `AuthUser` rejects
/// unauthenticated requests with 401 before the handler body runs.
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(AUTH_REQUIRED.into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized(AUTH_REQUIRED.into()))?;

        let claims = verify_token(token, &state.config.jwt_secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized(AUTH_REQUIRED.into()))?;

        let db = state.db.lock().await;
        let user = db
            .get_user(user_id)
            .map_err(|_| ApiError::Unauthorized(AUTH_REQUIRED.into()))?;

        if user.is_blocked {
            return Err(ApiError::Forbidden("Account has been blocked".into()));
        }

        Ok(AuthUser { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "T".into(),
            email: "t@example.com".into(),
            password_hash: String::new(),
            role: Role::Owner,
            phone: "077".into(),
            profile_image: None,
            is_verified: false,
            is_blocked: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip() {
        let user = sample_user();
        let token = create_token(&user, "secret", 1).unwrap();

        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, "owner");
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let user = sample_user();
        let token = create_token(&user, "secret", 1).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn token_rejects_expired() {
        let user = sample_user();
        let token = create_token(&user, "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
