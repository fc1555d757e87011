use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vista_store::Database;

use crate::config::ServerConfig;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::{chats, listings, reviews, users};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    pub rate_limiter: RateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/users", users::router())
        .nest("/api/boarding", listings::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/chat", chats::router())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let config = ServerConfig::default();
        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(10_000.0, 10_000.0),
        };
        (dir, state)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Register an account and return its bearer token.
    async fn register(router: &Router, name: &str, email: &str, role: &str) -> String {
        let (status, body) = send(
            router,
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": "secret42",
                "role": role,
                "phone": "0771234567",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_listing(router: &Router, token: &str) -> String {
        let (status, body) = send(
            router,
            Method::POST,
            "/api/boarding",
            Some(token),
            Some(json!({
                "title": "Sunrise Villa",
                "description": "Quiet rooms near campus",
                "address": {"street": "12 Temple Rd", "city": "Vavuniya"},
                "coordinates": {"latitude": 8.7542, "longitude": 80.4982},
                "price": {"monthly": 30000, "deposit": 10000},
                "gender": "male",
                "facilities": ["WiFi", "Parking"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "create listing failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_works() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let (status, body) = send(&router, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_listing_review_scenario() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let owner = register(&router, "Owner", "owner@example.com", "owner").await;
        let listing_id = create_listing(&router, &owner).await;

        let user = register(&router, "User", "user@example.com", "user").await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/reviews",
            Some(&user),
            Some(json!({
                "listing_id": listing_id,
                "rating": 5,
                "title": "Great",
                "comment": "Clean and quiet",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "review failed: {body}");

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/boarding/{listing_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["average_rating"], 5.0);
        assert_eq!(body["data"]["review_count"], 1);
        assert_eq!(body["data"]["facilities"], json!(["WiFi", "Parking"]));

        // A second review by the same user is rejected.
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/reviews",
            Some(&user),
            Some(json!({
                "listing_id": listing_id,
                "rating": 1,
                "title": "Changed my mind",
                "comment": "Not so great",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        // The rejected review did not move the aggregate.
        let (_, body) = send(
            &router,
            Method::GET,
            &format!("/api/boarding/{listing_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(body["data"]["average_rating"], 5.0);
        assert_eq!(body["data"]["review_count"], 1);
    }

    #[tokio::test]
    async fn non_owner_mutations_are_forbidden_and_harmless() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let owner = register(&router, "A", "a@example.com", "owner").await;
        let listing_id = create_listing(&router, &owner).await;

        let intruder = register(&router, "B", "b@example.com", "owner").await;

        let (status, _) = send(
            &router,
            Method::PUT,
            &format!("/api/boarding/{listing_id}"),
            Some(&intruder),
            Some(json!({"title": "Hijacked"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &router,
            Method::DELETE,
            &format!("/api/boarding/{listing_id}"),
            Some(&intruder),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Resource unchanged.
        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/boarding/{listing_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Sunrise Villa");
    }

    #[tokio::test]
    async fn plain_user_cannot_create_listing() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let user = register(&router, "U", "u@example.com", "user").await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/boarding",
            Some(&user),
            Some(json!({
                "title": "T",
                "description": "D",
                "address": {"street": "s", "city": "c"},
                "coordinates": {"latitude": 0.0, "longitude": 0.0},
                "price": {"monthly": 1000, "deposit": 0},
                "gender": "male",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn chat_is_gated_to_participants() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let owner = register(&router, "Owner", "o@example.com", "owner").await;
        let listing_id = create_listing(&router, &owner).await;

        let tenant = register(&router, "Tenant", "t@example.com", "user").await;
        let stranger = register(&router, "Stranger", "s@example.com", "user").await;

        let (_, owner_profile) =
            send(&router, Method::GET, "/api/users/me", Some(&owner), None).await;
        let owner_id = owner_profile["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/chat",
            Some(&tenant),
            Some(json!({"listing_id": listing_id, "participant_id": owner_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "create chat failed: {body}");
        let chat_id = body["data"]["id"].as_str().unwrap().to_string();

        for content in ["hello", "is the room free?"] {
            let (status, _) = send(
                &router,
                Method::POST,
                &format!("/api/chat/{chat_id}"),
                Some(&tenant),
                Some(json!({"content": content})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        // Non-participants can neither read nor write.
        let (status, _) = send(
            &router,
            Method::GET,
            &format!("/api/chat/{chat_id}"),
            Some(&stranger),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &router,
            Method::POST,
            &format!("/api/chat/{chat_id}"),
            Some(&stranger),
            Some(json!({"content": "let me in"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Participants read the history in append order.
        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/chat/{chat_id}"),
            Some(&owner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "hello");
        assert_eq!(messages[1]["content"], "is the room free?");

        // Recreating the same pair returns the existing thread.
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/chat",
            Some(&tenant),
            Some(json!({"listing_id": listing_id, "participant_id": owner_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"].as_str().unwrap(), chat_id);
    }

    #[tokio::test]
    async fn requests_without_token_are_unauthorized() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let (status, _) = send(&router, Method::GET, "/api/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&router, Method::GET, "/api/chat", Some("garbage-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_numeric_params_are_rejected() {
        let (_dir, state) = test_state();
        let router = build_router(state);

        let (status, body) =
            send(&router, Method::GET, "/api/boarding?page=abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &router,
            Method::GET,
            "/api/boarding?minPrice=cheap",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            Method::GET,
            "/api/boarding/search/nearby?latitude=8.75",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
