//! Discord webhook sender.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::WebhookError;
use crate::Identity;

/// Sender for a single Discord-compatible webhook URL.
///
/// Discord answers plain JSON messages with `204 No Content` and multipart
/// uploads with `200 OK`; both count as success here, anything else is a
/// failure.
pub struct DiscordWebhook {
    url: String,
    client: reqwest::Client,
}

impl DiscordWebhook {
    /// Create a sender with its own HTTP client.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a sender reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Post a text message tagged with `identity`.
    ///
    /// Returns false on any non-success response; the failure detail is
    /// logged here.
    pub async fn send_message(&self, content: &str, identity: &Identity) -> bool {
        match self.try_send_message(content, identity).await {
            Ok(()) => {
                debug!(channel = "discord", "Message sent");
                true
            }
            Err(e) => {
                warn!(channel = "discord", error = %e, "Failed to send message");
                false
            }
        }
    }

    /// Upload the file at `path` tagged with `identity`.
    ///
    /// Returns false on any non-success response or if the file cannot be
    /// read.
    pub async fn send_file(&self, path: &Path, identity: &Identity) -> bool {
        match self.try_send_file(path, identity).await {
            Ok(()) => {
                debug!(channel = "discord", path = %path.display(), "File sent");
                true
            }
            Err(e) => {
                warn!(
                    channel = "discord",
                    path = %path.display(),
                    error = %e,
                    "Failed to send file"
                );
                false
            }
        }
    }

    async fn try_send_message(
        &self,
        content: &str,
        identity: &Identity,
    ) -> Result<(), WebhookError> {
        let payload = MessagePayload {
            username: identity.display_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            content: content.to_string(),
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        Self::check_status(response).await
    }

    async fn try_send_file(&self, path: &Path, identity: &Identity) -> Result<(), WebhookError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("username", identity.display_name.clone())
            .text("avatar_url", identity.avatar_url.clone());

        let response = self.client.post(&self.url).multipart(form).send().await?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<(), WebhookError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(WebhookError::Failed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// JSON payload for a plain webhook message.
#[derive(Debug, Serialize)]
struct MessagePayload {
    username: String,
    avatar_url: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> Identity {
        Identity::new("alice", "https://example.com/alice.jpg")
    }

    #[tokio::test]
    async fn send_message_reports_success_on_204() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "avatar_url": "https://example.com/alice.jpg",
                "content": "https://example.com/p/abc/",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let hook = DiscordWebhook::new(format!("{}/hook", server.uri()));
        assert!(hook.send_message("https://example.com/p/abc/", &identity()).await);
    }

    #[tokio::test]
    async fn send_message_reports_failure_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let hook = DiscordWebhook::new(format!("{}/hook", server.uri()));
        assert!(!hook.send_message("hello", &identity()).await);
    }

    #[tokio::test]
    async fn send_file_uploads_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("story.jpg");
        std::fs::write(&file, b"not really a jpeg").unwrap();

        let hook = DiscordWebhook::new(format!("{}/hook", server.uri()));
        assert!(hook.send_file(&file, &identity()).await);
    }

    #[tokio::test]
    async fn send_file_reports_failure_for_missing_file() {
        let server = MockServer::start().await;
        let hook = DiscordWebhook::new(format!("{}/hook", server.uri()));

        let missing = Path::new("/nonexistent/story.jpg");
        assert!(!hook.send_file(missing, &identity()).await);
    }

    #[tokio::test]
    async fn send_file_reports_failure_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("story.mp4");
        std::fs::write(&file, b"bytes").unwrap();

        let hook = DiscordWebhook::new(format!("{}/hook", server.uri()));
        assert!(!hook.send_file(&file, &identity()).await);
    }
}
