//! Session persistence for the upstream service.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated upstream session.
///
/// Stored next to the rest of the relay state so restarts reuse the token
/// instead of logging in again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token returned by the login endpoint.
    pub token: String,
    /// When this session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with the given token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            created_at: Utc::now(),
        }
    }

    /// Load session from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let session: Self = serde_json::from_str(&content)?;
        Ok(session)
    }

    /// Save session to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
