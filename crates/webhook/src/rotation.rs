//! Round-robin target selection with a persisted cursor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::discord::DiscordWebhook;
use crate::error::WebhookError;
use crate::{DeliveryChannel, Identity};

/// Persisted rotation state.
///
/// The state file is a single JSON object rewritten in full on every update.
/// Keys other than the cursor are preserved across rewrites so the file can
/// be shared with other tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationState {
    /// Number of selections made so far.
    #[serde(default)]
    pub delivery_cursor: u64,
    /// Unknown keys, carried through untouched.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl RotationState {
    /// Load state from a JSON file, defaulting to cursor 0 if the file is
    /// absent or unparseable.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid rotation state, resetting");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable rotation state, resetting");
                Self::default()
            }
        }
    }

    /// Save state to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), WebhookError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Round-robin selector over a set of configured webhook targets.
///
/// Selection is `targets[cursor % N]`; the cursor increments on every
/// selection and is persisted immediately, so the rotation continues where
/// it left off across restarts. A cursor outside the expected range (a
/// hand-edited or stale state file) is normalized by the same modulo rather
/// than rejected.
///
/// Single-writer: concurrent processes sharing the same state file will race
/// on the cursor.
pub struct TargetRotation {
    targets: Vec<String>,
    state_path: PathBuf,
}

impl TargetRotation {
    /// Create a rotation over the given targets.
    ///
    /// # Errors
    /// Returns an error if `targets` is empty.
    pub fn new(
        targets: Vec<String>,
        state_path: impl Into<PathBuf>,
    ) -> Result<Self, WebhookError> {
        if targets.is_empty() {
            return Err(WebhookError::NotConfigured(
                "at least one webhook target is required".to_string(),
            ));
        }
        Ok(Self {
            targets,
            state_path: state_path.into(),
        })
    }

    /// Number of configured targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no targets are configured. Always false by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Select the next target and advance the persisted cursor.
    ///
    /// The cursor is re-read from disk on every call; the state file is the
    /// source of truth, not this instance.
    pub fn next_target(&self) -> Result<&str, WebhookError> {
        let mut state = RotationState::load(&self.state_path);

        let index = usize::try_from(state.delivery_cursor % self.targets.len() as u64)
            .unwrap_or_default();
        state.delivery_cursor = state.delivery_cursor.wrapping_add(1);
        state.save(&self.state_path)?;

        debug!(index, cursor = state.delivery_cursor, "Selected webhook target");
        Ok(&self.targets[index])
    }
}

/// Delivery channel that draws a fresh target from a [`TargetRotation`] for
/// every delivery.
pub struct RotatingDelivery {
    rotation: TargetRotation,
    client: reqwest::Client,
}

impl RotatingDelivery {
    /// Create a rotating delivery channel.
    #[must_use]
    pub fn new(rotation: TargetRotation) -> Self {
        Self {
            rotation,
            client: reqwest::Client::new(),
        }
    }

    fn next_sender(&self) -> Option<DiscordWebhook> {
        match self.rotation.next_target() {
            Ok(url) => Some(DiscordWebhook::with_client(url, self.client.clone())),
            Err(e) => {
                error!(error = %e, "Failed to select webhook target");
                None
            }
        }
    }
}

#[async_trait]
impl DeliveryChannel for RotatingDelivery {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver_text(&self, content: &str, identity: &Identity) -> bool {
        match self.next_sender() {
            Some(sender) => sender.send_message(content, identity).await,
            None => false,
        }
    }

    async fn deliver_file(&self, path: &Path, identity: &Identity) -> bool {
        match self.next_sender() {
            Some(sender) => sender.send_file(path, identity).await,
            None => false,
        }
    }
}
