//! Bearer-token persistence.
//!
//! One platform-appropriate file location, chosen at startup.  The token is
//! a disposable credential: a failed write surfaces as an error instead of
//! being retried against alternative storage backends.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ClientError;

/// File-backed storage for the current bearer token.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store the token in the platform data directory:
    /// - Linux:   `~/.local/share/boardvista/token`
    /// - macOS:   `~/Library/Application Support/com.boardvista.boardvista/token`
    /// - Windows: `{FOLDERID_RoamingAppData}\boardvista\boardvista\data\token`
    pub fn new() -> Result<Self, ClientError> {
        let project_dirs =
            ProjectDirs::from("com", "boardvista", "boardvista").ok_or(ClientError::NoDataDir)?;
        Ok(Self {
            path: project_dirs.data_dir().join("token"),
        })
    }

    /// Store the token at an explicit path.  Useful for tests.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist a freshly issued token, replacing any previous one.
    pub fn save(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        tracing::debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    /// Load the stored token, or `None` when the user never logged in.
    pub fn load(&self) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim().to_string();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Forget the stored token (logout).
    pub fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
