use thiserror::Error;

/// Errors produced by the client gateway.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connection refused, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with `success: false`.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token file I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// An authenticated call was made with no stored token.
    #[error("Not logged in (no stored token)")]
    MissingToken,
}
