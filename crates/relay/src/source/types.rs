//! Content source data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream numeric account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A published post, as listed by the upstream feed (newest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier within the account's namespace. Never reused.
    pub id: String,
    /// Short code used in the canonical post URL.
    pub code: String,
    /// When the post was published.
    pub taken_at: DateTime<Utc>,
}

/// An active story, available until it expires upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryItem {
    /// Stable identifier within the account's namespace.
    pub id: String,
    /// Capture timestamp; used only for the local filename.
    pub taken_at: DateTime<Utc>,
    /// Direct URL to the story's media payload.
    pub media_url: String,
}
