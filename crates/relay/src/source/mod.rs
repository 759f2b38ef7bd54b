//! Content source adapter: account resolution, feed listing, story capture.

pub mod client;
pub mod session;
pub mod types;

pub use client::ApiSource;
pub use session::Session;
pub use types::{AccountId, MediaItem, StoryItem};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use webhook::Identity;

/// Errors from the upstream content service.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Account or item does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local file write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One authenticated view of the upstream service.
///
/// Operations may fail with transport or auth errors; retrying is the outer
/// loop's job, not the adapter's.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve an account name to its numeric id.
    async fn resolve_account(&self, username: &str) -> Result<AccountId, SourceError>;

    /// Fetch the display identity attached to outbound deliveries.
    async fn account_identity(&self, id: AccountId) -> Result<Identity, SourceError>;

    /// List the account's recent posts, most recent first.
    async fn list_media(&self, id: AccountId) -> Result<Vec<MediaItem>, SourceError>;

    /// List the account's currently active stories.
    async fn list_active_stories(&self, id: AccountId) -> Result<Vec<StoryItem>, SourceError>;

    /// Download a story's media into `dir` under the `filename` stem; the
    /// adapter appends the extension it derives from the payload. Returns
    /// the final local path.
    async fn materialize_story(
        &self,
        story: &StoryItem,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, SourceError>;
}
