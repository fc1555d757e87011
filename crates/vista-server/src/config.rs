//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Fallback signing secret for local development only.
const DEV_JWT_SECRET: &str = "boardvista-dev-secret";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.  When unset, the store
    /// picks the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// HMAC secret used to sign bearer tokens.
    /// Env: `JWT_SECRET`
    /// Default: a development-only constant (warned about at startup).
    pub jwt_secret: String,

    /// Bearer token lifetime in hours.
    /// Env: `TOKEN_TTL_HOURS`
    /// Default: `72`
    pub token_ttl_hours: i64,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"BoardVista"`
    pub instance_name: String,

    /// Sustained per-IP request rate (requests per second).
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `10.0`
    pub rate_limit_per_sec: f64,

    /// Per-IP burst capacity.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30.0`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 72,
            instance_name: "BoardVista".to_string(),
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }
        if config.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set, using development-only secret");
        }

        if let Ok(val) = std::env::var("TOKEN_TTL_HOURS") {
            if let Ok(hours) = val.parse::<i64>() {
                config.token_ttl_hours = hours;
            } else {
                tracing::warn!(value = %val, "Invalid TOKEN_TTL_HOURS, using default");
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_PER_SEC") {
            if let Ok(rate) = val.parse::<f64>() {
                config.rate_limit_per_sec = rate;
            } else {
                tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default");
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_BURST") {
            if let Ok(burst) = val.parse::<f64>() {
                config.rate_limit_burst = burst;
            } else {
                tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.token_ttl_hours, 72);
        assert!(config.database_path.is_none());
    }
}
