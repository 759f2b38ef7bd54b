//! Webhook delivery for relayed content.
//!
//! This crate provides the outbound half of the relay: Discord-compatible
//! webhook senders plus a persisted round-robin selector that spreads
//! deliveries across a set of configured targets.
//!
//! # Usage
//!
//! ```no_run
//! use webhook::{DeliveryChannel, Identity, RotatingDelivery, TargetRotation};
//!
//! # async fn example() -> Result<(), webhook::WebhookError> {
//! let rotation = TargetRotation::new(
//!     vec![
//!         "https://discord.com/api/webhooks/1/aaa".to_string(),
//!         "https://discord.com/api/webhooks/2/bbb".to_string(),
//!     ],
//!     "data/targets.json",
//! )?;
//! let delivery = RotatingDelivery::new(rotation);
//!
//! let identity = Identity::new("alice", "https://example.com/avatar.jpg");
//! let ok = delivery.deliver_text("https://example.com/p/abc/", &identity).await;
//! # let _ = ok;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`DeliveryChannel`] trait defines the transport interface; outcomes are
//!   booleans, never errors, so callers can apply a uniform skip-and-continue
//!   policy without per-call error handling.
//! - [`DiscordWebhook`] sends to a single webhook URL.
//! - [`TargetRotation`] persists the round-robin cursor between runs.
//! - [`RotatingDelivery`] combines the two behind the trait.

pub mod discord;
pub mod error;
pub mod rotation;

pub use discord::DiscordWebhook;
pub use error::WebhookError;
pub use rotation::{RotatingDelivery, TargetRotation};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Display identity attached to outbound deliveries.
///
/// Webhook messages are tagged with the monitored account's name and avatar
/// so the destination channel shows them as coming from that account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Display name shown on the delivered message.
    pub display_name: String,
    /// Avatar image URL shown on the delivered message.
    pub avatar_url: String,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(display_name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_url: avatar_url.into(),
        }
    }
}

/// Trait for outbound delivery transports.
///
/// Delivery failures are expected (rate limits, transient network) and are
/// reported as boolean outcomes rather than raised errors. Implementations
/// log the failure detail themselves.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Name of this channel, for logging.
    fn name(&self) -> &'static str;

    /// Post a short text payload tagged with `identity`.
    ///
    /// Returns false on any non-success response.
    async fn deliver_text(&self, content: &str, identity: &Identity) -> bool;

    /// Upload the file at `path` tagged with `identity`.
    ///
    /// Returns false on any non-success response or I/O error. The caller
    /// decides whether to delete the local file.
    async fn deliver_file(&self, path: &Path, identity: &Identity) -> bool;
}
