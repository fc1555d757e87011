//! # vista-server
//!
//! REST backend for the BoardVista boarding-house platform.
//!
//! This binary provides:
//! - **Listings API**: browse/filter/paginate, geo-proximity search, and
//!   ownership-gated create/update/delete
//! - **Reviews API** with synchronous rating aggregation onto listings
//! - **Chat API**: two-participant, listing-scoped message threads
//! - **Accounts API**: registration, login, and profile management with
//!   JWT bearer tokens
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod chats;
mod config;
mod error;
mod listings;
mod ownership;
mod rate_limit;
mod reviews;
mod users;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vista_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vista_server=debug")),
        )
        .init();

    info!("Starting BoardVista server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        http_addr = %config.http_addr,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Store (runs migrations on open)
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    // Rate limiter, sized from config
    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    // Application state for the HTTP API
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        config: Arc::new(config.clone()),
        rate_limiter: rate_limiter.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
