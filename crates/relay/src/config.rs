//! Environment-derived configuration.

use anyhow::{bail, Context, Result};

/// Startup configuration for the relay.
///
/// Credentials and endpoints come from the environment. A missing required
/// variable aborts startup before the loop begins; nothing here is reloaded
/// at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Login name for the content source.
    pub source_username: String,
    /// Login password for the content source.
    pub source_password: String,
    /// Base URL of the content source API.
    pub source_api_url: String,
    /// Base URL for canonical public post links.
    pub source_web_url: String,
    /// Delivery targets, alternated round-robin.
    pub webhook_urls: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Requires `SOURCE_USERNAME`, `SOURCE_PASSWORD`, `SOURCE_API_URL`,
    /// `SOURCE_WEB_URL`, `WEBHOOK_URL_1` and `WEBHOOK_URL_2`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            source_username: require("SOURCE_USERNAME")?,
            source_password: require("SOURCE_PASSWORD")?,
            source_api_url: require("SOURCE_API_URL")?,
            source_web_url: require("SOURCE_WEB_URL")?,
            webhook_urls: vec![require("WEBHOOK_URL_1")?, require("WEBHOOK_URL_2")?],
        })
    }
}

fn require(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("{name} must be set"))?;
    if value.trim().is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_requires_all_variables() {
        // Sequential within one test: env mutation is process-global.
        for (name, value) in [
            ("SOURCE_USERNAME", "poller"),
            ("SOURCE_PASSWORD", "hunter2"),
            ("SOURCE_API_URL", "https://api.example.com/v1"),
            ("SOURCE_WEB_URL", "https://www.example.com"),
            ("WEBHOOK_URL_1", "https://discord.com/api/webhooks/1/a"),
            ("WEBHOOK_URL_2", "https://discord.com/api/webhooks/2/b"),
        ] {
            std::env::set_var(name, value);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.source_username, "poller");
        assert_eq!(config.webhook_urls.len(), 2);

        std::env::remove_var("WEBHOOK_URL_2");
        assert!(Config::from_env().is_err());

        std::env::set_var("WEBHOOK_URL_2", "   ");
        assert!(Config::from_env().is_err());
    }
}
