//! Error types for webhook delivery.

use thiserror::Error;

/// Errors that can occur inside the webhook plumbing.
///
/// These never cross the [`DeliveryChannel`](crate::DeliveryChannel)
/// boundary; senders log them and report a boolean outcome instead.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Webhook endpoint returned a non-success status
    #[error("webhook returned {status}: {body}")]
    Failed { status: u16, body: String },

    /// Rotation state could not be serialized
    #[error("rotation state error: {0}")]
    State(#[from] serde_json::Error),

    /// No targets configured
    #[error("not configured: {0}")]
    NotConfigured(String),
}
