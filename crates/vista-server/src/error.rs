use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use vista_shared::api::{ApiResponse, FieldError};
use vista_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    /// Translate a store error, substituting a resource-specific message
    /// for the generic not-found case.
    pub fn from_store(err: StoreError, not_found: &str) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound(not_found.to_string()),
            other => other.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Duplicate(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body): (StatusCode, ApiResponse<()>) = match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, ApiResponse::invalid(errors))
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ApiResponse::error(message))
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ApiResponse::error(message))
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, ApiResponse::error(message)),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, ApiResponse::error(message)),
            ApiError::Internal(message) => {
                // Raw store/programming errors are logged, never echoed.
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error("Internal server error"),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_with_resource_message() {
        let err = ApiError::from_store(StoreError::NotFound, "Boarding house not found");
        assert!(matches!(err, ApiError::NotFound(m) if m == "Boarding house not found"));
    }

    #[test]
    fn store_duplicate_maps_to_bad_request() {
        let err: ApiError = StoreError::Duplicate("already reviewed".into()).into();
        assert!(matches!(err, ApiError::BadRequest(m) if m == "already reviewed"));
    }
}
