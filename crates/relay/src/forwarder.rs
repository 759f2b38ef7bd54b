//! Forwarding loop - polls the account and relays new content.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use webhook::{DeliveryChannel, Identity};

use crate::source::{AccountId, ContentSource, MediaItem, StoryItem};
use crate::store::{Kind, Storage};

/// Configuration for the forwarding loop.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Account to monitor.
    pub account: String,
    /// Base URL for canonical post links.
    pub post_url_base: String,
    /// Delay between forwarded posts.
    pub post_delay: Duration,
    /// Delay between forwarded stories.
    pub story_delay: Duration,
    /// Bounds for the randomized sleep between cycles.
    pub cycle_sleep: (Duration, Duration),
    /// Sleep after a failed cycle before retrying.
    pub recovery_sleep: Duration,
    /// Hours added to story capture times before filename formatting.
    pub filename_utc_offset_hours: i64,
}

impl ForwarderConfig {
    /// Reference timings: 1 s between posts, 2 s between stories, 550-600 s
    /// between cycles, 60 s after a failed cycle, UTC+7 filenames.
    #[must_use]
    pub fn new(account: impl Into<String>, post_url_base: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            post_url_base: post_url_base.into(),
            post_delay: Duration::from_secs(1),
            story_delay: Duration::from_secs(2),
            cycle_sleep: (Duration::from_secs(550), Duration::from_secs(600)),
            recovery_sleep: Duration::from_secs(60),
            filename_utc_offset_hours: 7,
        }
    }
}

/// Counters from a single forwarding cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Posts not yet seen at the start of the cycle.
    pub new_posts: usize,
    /// Posts delivered and marked.
    pub posts_forwarded: usize,
    /// Posts whose delivery failed; retried next cycle.
    pub posts_failed: usize,
    /// Stories not yet seen at the start of the cycle.
    pub new_stories: usize,
    /// Stories delivered, deleted locally, and marked.
    pub stories_forwarded: usize,
    /// Stories that failed to capture or deliver; retried next cycle.
    pub stories_failed: usize,
}

/// Orchestrates poll -> filter -> deliver -> commit.
pub struct Forwarder {
    source: Arc<dyn ContentSource>,
    delivery: Arc<dyn DeliveryChannel>,
    storage: Storage,
    config: ForwarderConfig,
}

impl Forwarder {
    /// Create a new forwarder.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        delivery: Arc<dyn DeliveryChannel>,
        storage: Storage,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            source,
            delivery,
            storage,
            config,
        }
    }

    /// Run cycles until `cancel` trips.
    ///
    /// A cycle error is logged and followed by the recovery sleep; it never
    /// ends the loop. Only cancellation does.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(account = %self.config.account, "Starting forwarder");

        while !cancel.is_cancelled() {
            let sleep = match self.cycle().await {
                Ok(report) => {
                    info!(
                        posts = report.posts_forwarded,
                        stories = report.stories_forwarded,
                        failed = report.posts_failed + report.stories_failed,
                        "Cycle complete"
                    );
                    self.jittered_sleep()
                }
                Err(e) => {
                    error!(error = %e, "Cycle failed");
                    self.config.recovery_sleep
                }
            };

            debug!(seconds = sleep.as_secs(), "Waiting before next cycle");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(sleep) => {}
            }
        }

        info!("Forwarder stopped");
        Ok(())
    }

    /// One full pass: post phase, then story phase.
    pub async fn cycle(&self) -> Result<CycleReport> {
        info!(account = %self.config.account, "Fetching account data");

        let account_id = self.source.resolve_account(&self.config.account).await?;
        let identity = self.source.account_identity(account_id).await?;

        let mut report = CycleReport::default();
        self.forward_posts(account_id, &identity, &mut report).await?;
        self.forward_stories(account_id, &identity, &mut report).await?;
        Ok(report)
    }

    async fn forward_posts(
        &self,
        id: AccountId,
        identity: &Identity,
        report: &mut CycleReport,
    ) -> Result<()> {
        let media = self.source.list_media(id).await?;
        let seen = self.storage.seen_ids(Kind::Post, &self.config.account)?;
        let new_posts: Vec<&MediaItem> = media.iter().filter(|m| !seen.contains(&m.id)).collect();

        if new_posts.is_empty() {
            info!("No new posts");
            return Ok(());
        }
        info!(count = new_posts.len(), "Found new posts");
        report.new_posts = new_posts.len();

        // Upstream lists newest first; deliver oldest first.
        for (i, item) in new_posts.iter().rev().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.post_delay).await;
            }

            let url = post_url(&self.config.post_url_base, &item.code);
            if self.delivery.deliver_text(&url, identity).await {
                self.storage.mark_seen(Kind::Post, &self.config.account, &item.id)?;
                report.posts_forwarded += 1;
                info!(id = %item.id, url = %url, "Forwarded post");
            } else {
                report.posts_failed += 1;
                warn!(id = %item.id, url = %url, "Post delivery failed, will retry next cycle");
            }
        }
        Ok(())
    }

    async fn forward_stories(
        &self,
        id: AccountId,
        identity: &Identity,
        report: &mut CycleReport,
    ) -> Result<()> {
        let stories = self.source.list_active_stories(id).await?;
        let seen = self.storage.seen_ids(Kind::Story, &self.config.account)?;
        let new_stories: Vec<&StoryItem> =
            stories.iter().filter(|s| !seen.contains(&s.id)).collect();

        if new_stories.is_empty() {
            info!("No new stories");
            return Ok(());
        }
        info!(count = new_stories.len(), "Found new stories");
        report.new_stories = new_stories.len();

        let dir = self.storage.stories_dir(&self.config.account)?;

        // Stories go out in listing order, no reversal.
        for (i, story) in new_stories.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.story_delay).await;
            }

            let filename = story_filename(
                &self.config.account,
                story.taken_at,
                self.config.filename_utc_offset_hours,
            );
            let path = match self.source.materialize_story(story, &dir, &filename).await {
                Ok(path) => path,
                Err(e) => {
                    report.stories_failed += 1;
                    warn!(id = %story.id, error = %e, "Failed to capture story, will retry next cycle");
                    continue;
                }
            };
            debug!(id = %story.id, path = %path.display(), "Captured story");

            if self.delivery.deliver_file(&path, identity).await {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove delivered story file");
                }
                self.storage.mark_seen(Kind::Story, &self.config.account, &story.id)?;
                report.stories_forwarded += 1;
                info!(id = %story.id, "Forwarded story");
            } else {
                // Keep the file and the unmarked id so the story is retried
                // next cycle.
                report.stories_failed += 1;
                warn!(id = %story.id, path = %path.display(), "Story delivery failed, keeping file");
            }
        }
        Ok(())
    }

    fn jittered_sleep(&self) -> Duration {
        let (min, max) = self.config.cycle_sleep;
        if max <= min {
            return min;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Canonical public URL for a post code.
fn post_url(base: &str, code: &str) -> String {
    format!("{}/p/{code}/", base.trim_end_matches('/'))
}

/// Local filename stem for a story: account plus the capture time shifted to
/// the audience timezone, `DDMMYY_HHMMSS`.
fn story_filename(account: &str, taken_at: DateTime<Utc>, offset_hours: i64) -> String {
    let shifted = taken_at + chrono::Duration::hours(offset_hours);
    format!(
        "{account}_stories_{}_{}",
        shifted.format("%d%m%y"),
        shifted.format("%H%M%S")
    )
}
