//! Filesystem state: append-only dedup logs and story downloads.
//!
//! One newline-delimited text file per (kind, account) records every item
//! identifier that was successfully forwarded. The logs are append-only and
//! never compacted; the seen set only grows over an account's history.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// Category of forwarded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A published post.
    Post,
    /// An ephemeral story.
    Story,
}

impl Kind {
    /// Plural name, used in log filenames.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Story => "stories",
        }
    }
}

/// Filesystem-backed relay state, rooted at a data directory.
///
/// Single-writer: concurrent processes sharing the same root will interleave
/// appends.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create storage rooted at `root`. Directories are created lazily on
    /// first write, not here.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn seen_log(&self, kind: Kind, account: &str) -> PathBuf {
        self.root
            .join("seen")
            .join(format!("{}_{account}.txt", kind.as_str()))
    }

    /// Load the full seen set for (kind, account).
    ///
    /// A missing log means nothing was forwarded yet; any other read failure
    /// propagates rather than being treated as an empty set.
    pub fn seen_ids(&self, kind: Kind, account: &str) -> Result<HashSet<String>> {
        let path = self.seen_log(kind, account);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read seen log {}", path.display())),
        }
    }

    /// Membership test over a full reload of the backing log.
    pub fn is_seen(&self, kind: Kind, account: &str, id: &str) -> Result<bool> {
        Ok(self.seen_ids(kind, account)?.contains(id))
    }

    /// Append `id` to the (kind, account) log, creating it on first write.
    ///
    /// Existing lines are never rewritten or removed; marking the same id
    /// twice appends a duplicate line and leaves membership unchanged.
    pub fn mark_seen(&self, kind: Kind, account: &str, id: &str) -> Result<()> {
        let path = self.seen_log(kind, account);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open seen log {}", path.display()))?;
        writeln!(file, "{id}")
            .with_context(|| format!("failed to append to seen log {}", path.display()))?;

        debug!(kind = kind.as_str(), account, id, "Marked item as forwarded");
        Ok(())
    }

    /// Per-account download directory for story media, created on demand.
    pub fn stories_dir(&self, account: &str) -> Result<PathBuf> {
        let dir = self.root.join("stories").join(account);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }
}
