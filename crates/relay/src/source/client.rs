//! HTTP client for the upstream content API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use webhook::Identity;

use super::session::Session;
use super::types::{AccountId, MediaItem, StoryItem};
use super::{ContentSource, SourceError};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Reqwest-backed [`ContentSource`] with bearer-token auth.
#[derive(Clone)]
pub struct ApiSource {
    /// HTTP client.
    client: Client,
    /// API base URL, no trailing slash.
    base_url: String,
    /// Bearer token from the current session.
    token: String,
}

impl ApiSource {
    /// Create a source from an existing session.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, session: &Session) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base(base_url.into()),
            token: session.token.clone(),
        })
    }

    /// Log in with account credentials and return the new session.
    ///
    /// # Errors
    /// Returns [`SourceError::Auth`] when the credentials are rejected.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        let url = format!("{}/auth/login", normalize_base(base_url.to_string()));

        let response = client
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Auth(format!("login rejected for {username}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: LoginResponse = response.json().await?;
        Ok(Session::new(body.token))
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentSource for ApiSource {
    async fn resolve_account(&self, username: &str) -> Result<AccountId, SourceError> {
        let response: UserResponse = self
            .get(&format!("/users/by_username/{username}"))
            .await
            .map_err(|e| match e {
                SourceError::NotFound(_) => SourceError::NotFound(username.to_string()),
                other => other,
            })?;
        Ok(AccountId(response.user.pk))
    }

    async fn account_identity(&self, id: AccountId) -> Result<Identity, SourceError> {
        let response: UserResponse = self.get(&format!("/users/{id}/info")).await?;
        Ok(Identity::new(
            response.user.full_name,
            response.user.profile_pic_url,
        ))
    }

    async fn list_media(&self, id: AccountId) -> Result<Vec<MediaItem>, SourceError> {
        let response: MediaListResponse = self.get(&format!("/users/{id}/media")).await?;
        Ok(response.items.into_iter().map(MediaPayload::into_item).collect())
    }

    async fn list_active_stories(&self, id: AccountId) -> Result<Vec<StoryItem>, SourceError> {
        let response: StoryListResponse = self.get(&format!("/users/{id}/stories")).await?;
        let items = response
            .items
            .into_iter()
            .filter_map(|payload| {
                let id = payload.pk;
                match payload.into_story() {
                    Some(story) => Some(story),
                    None => {
                        warn!(id, "Story has no media URL, skipping");
                        None
                    }
                }
            })
            .collect();
        Ok(items)
    }

    async fn materialize_story(
        &self,
        story: &StoryItem,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, SourceError> {
        debug!(id = %story.id, url = %story.media_url, "Downloading story media");

        let response = self
            .client
            .get(&story.media_url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let extension = media_extension(content_type.as_deref(), &story.media_url);

        let bytes = response.bytes().await?;
        let path = dir.join(format!("{filename}.{extension}"));
        tokio::fs::write(&path, &bytes).await?;

        Ok(path)
    }
}

/// Pick a file extension from the response content type, falling back to the
/// URL path, then to a generic binary suffix.
fn media_extension(content_type: Option<&str>, url: &str) -> String {
    match content_type.map(|c| c.split(';').next().unwrap_or(c).trim()) {
        Some("image/jpeg") => return "jpg".to_string(),
        Some("image/png") => return "png".to_string(),
        Some("image/webp") => return "webp".to_string(),
        Some("video/mp4") => return "mp4".to_string(),
        _ => {}
    }

    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    if let Some((_, ext)) = path_part.rsplit_once('.') {
        if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(char::is_alphanumeric) {
            return ext.to_ascii_lowercase();
        }
    }

    "bin".to_string()
}

fn normalize_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

// =============================================================================
// API wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    pk: u64,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    profile_pic_url: String,
}

#[derive(Debug, Deserialize)]
struct MediaListResponse {
    items: Vec<MediaPayload>,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    pk: u64,
    code: String,
    /// Unix timestamp, seconds.
    #[serde(default)]
    taken_at: i64,
}

impl MediaPayload {
    fn into_item(self) -> MediaItem {
        MediaItem {
            id: self.pk.to_string(),
            code: self.code,
            taken_at: timestamp(self.taken_at),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoryListResponse {
    items: Vec<StoryPayload>,
}

#[derive(Debug, Deserialize)]
struct StoryPayload {
    pk: u64,
    #[serde(default)]
    taken_at: i64,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl StoryPayload {
    fn into_story(self) -> Option<StoryItem> {
        let media_url = self.video_url.or(self.image_url)?;
        Some(StoryItem {
            id: self.pk.to_string(),
            taken_at: timestamp(self.taken_at),
            media_url,
        })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> ApiSource {
        ApiSource::new(server.uri(), &Session::new("tok".to_string())).unwrap()
    }

    #[tokio::test]
    async fn login_returns_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "tok-abc",
            })))
            .mount(&server)
            .await;

        let session = ApiSource::login(&server.uri(), "poller", "hunter2").await.unwrap();
        assert_eq!(session.token, "tok-abc");
    }

    #[tokio::test]
    async fn login_maps_rejection_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = ApiSource::login(&server.uri(), "poller", "wrong").await.unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }

    #[tokio::test]
    async fn resolve_account_parses_pk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/by_username/alice"))
            .and(bearer_token("tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": { "pk": 42 },
            })))
            .mount(&server)
            .await;

        assert_eq!(source(&server).resolve_account("alice").await.unwrap(), AccountId(42));
    }

    #[tokio::test]
    async fn resolve_account_maps_missing_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/by_username/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = source(&server).resolve_account("ghost").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn account_identity_maps_profile_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/42/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": {
                    "pk": 42,
                    "full_name": "Alice Example",
                    "profile_pic_url": "https://cdn.example/alice.jpg",
                },
            })))
            .mount(&server)
            .await;

        let identity = source(&server).account_identity(AccountId(42)).await.unwrap();
        assert_eq!(identity.display_name, "Alice Example");
        assert_eq!(identity.avatar_url, "https://cdn.example/alice.jpg");
    }

    #[tokio::test]
    async fn list_media_preserves_upstream_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/42/media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "pk": 3, "code": "c3", "taken_at": 1_700_000_300 },
                    { "pk": 2, "code": "c2", "taken_at": 1_700_000_200 },
                    { "pk": 1, "code": "c1", "taken_at": 1_700_000_100 },
                ],
            })))
            .mount(&server)
            .await;

        let media = source(&server).list_media(AccountId(42)).await.unwrap();
        let ids: Vec<&str> = media.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["3", "2", "1"]);
        assert_eq!(media[0].code, "c3");
    }

    #[tokio::test]
    async fn list_stories_prefers_video_and_skips_bare_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/42/stories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "pk": 10,
                        "taken_at": 1_700_000_000,
                        "video_url": "https://cdn.example/10.mp4",
                        "image_url": "https://cdn.example/10.jpg",
                    },
                    { "pk": 11, "taken_at": 1_700_000_060, "image_url": "https://cdn.example/11.jpg" },
                    { "pk": 12, "taken_at": 1_700_000_120 },
                ],
            })))
            .mount(&server)
            .await;

        let stories = source(&server).list_active_stories(AccountId(42)).await.unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].media_url, "https://cdn.example/10.mp4");
        assert_eq!(stories[1].media_url, "https://cdn.example/11.jpg");
    }

    #[tokio::test]
    async fn materialize_story_writes_bytes_with_derived_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/99"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(b"jpeg bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let story = StoryItem {
            id: "99".to_string(),
            taken_at: Utc::now(),
            media_url: format!("{}/media/99", server.uri()),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = source(&server)
            .materialize_story(&story, dir.path(), "alice_stories_010124_170000")
            .await
            .unwrap();

        assert!(path.ends_with("alice_stories_010124_170000.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn media_extension_falls_back_to_url_then_bin() {
        assert_eq!(media_extension(Some("video/mp4"), "https://x/y"), "mp4");
        assert_eq!(media_extension(None, "https://x/clip.MP4?sig=abc"), "mp4");
        assert_eq!(media_extension(Some("application/octet-stream"), "https://x/blob"), "bin");
    }
}
