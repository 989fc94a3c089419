//! Durable per-source feed cache, one `feeds/<label>.json` file per source.
//!
//! Files are keyed by the source's registry label, never by URL. Every
//! operation on a URL that is not in the registry is a no-op reporting
//! "absent". An entry that lacks any of the three feed bodies is treated
//! exactly like a missing one.

use super::{StoreError, read_json_lenient, write_json_atomic};
use crate::config::SharedRegistry;
use crate::models::{FeedCacheEntry, FeedCacheMetadata, GeneratedFeeds};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const FEEDS_DIR: &str = "feeds";
/// Entries older than this are stale unless the caller says otherwise.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// On-disk shape before validation; any feed body may be missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(default)]
    feeds: Option<StoredFeeds>,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    article_count: usize,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredFeeds {
    rss: Option<String>,
    atom: Option<String>,
    json: Option<String>,
}

impl StoredEntry {
    fn validate(self) -> Option<FeedCacheEntry> {
        let feeds = self.feeds?;
        let non_empty = |body: Option<String>| body.filter(|b| !b.is_empty());
        Some(FeedCacheEntry {
            feeds: GeneratedFeeds {
                rss: non_empty(feeds.rss)?,
                atom: non_empty(feeds.atom)?,
                json: non_empty(feeds.json)?,
            },
            source_url: self.source_url,
            article_count: self.article_count,
            cached_at: self.cached_at,
        })
    }
}

#[derive(Debug)]
pub struct FeedStore {
    feeds_dir: PathBuf,
    registry: SharedRegistry,
    /// Valid entries read or written so far, by label.
    snapshot: Mutex<HashMap<String, FeedCacheEntry>>,
}

impl FeedStore {
    pub fn new(data_dir: impl AsRef<Path>, registry: SharedRegistry) -> Self {
        Self {
            feeds_dir: data_dir.as_ref().join(FEEDS_DIR),
            registry,
            snapshot: Mutex::new(HashMap::new()),
        }
    }

    /// `feeds/<label>.json` for a registered source.
    pub fn file_path(&self, url: &str) -> Option<PathBuf> {
        let label = self.registry.label_for(url)?;
        Some(self.feeds_dir.join(format!("{label}.json")))
    }

    pub async fn get(&self, url: &str) -> Option<FeedCacheEntry> {
        let label = self.registry.label_for(url)?;
        let mut snapshot = self.snapshot.lock().await;
        if let Some(entry) = snapshot.get(&label) {
            return Some(entry.clone());
        }

        let path = self.feeds_dir.join(format!("{label}.json"));
        let stored: StoredEntry = read_json_lenient(&path).await?;
        match stored.validate() {
            Some(entry) => {
                snapshot.insert(label, entry.clone());
                Some(entry)
            }
            None => {
                warn!(%url, path = %path.display(), "Invalid feed store entry, ignoring");
                None
            }
        }
    }

    /// Persist feeds for `url`. Unregistered sources are silently skipped.
    #[instrument(level = "info", skip(self, feeds))]
    pub async fn set(
        &self,
        url: &str,
        feeds: &GeneratedFeeds,
        article_count: usize,
    ) -> Result<(), StoreError> {
        let Some(label) = self.registry.label_for(url) else {
            debug!("Source not registered, not persisting feeds");
            return Ok(());
        };
        let entry = FeedCacheEntry {
            feeds: feeds.clone(),
            source_url: url.to_string(),
            article_count,
            cached_at: Utc::now(),
        };

        let path = self.feeds_dir.join(format!("{label}.json"));
        let tmp = self.feeds_dir.join(format!("{label}.json.tmp"));
        let mut snapshot = self.snapshot.lock().await;
        write_json_atomic(&path, &tmp, &entry).await?;
        snapshot.insert(label, entry);
        info!(path = %path.display(), "Saved feeds to disk");
        Ok(())
    }

    /// Whether a file exists for `url`, valid or not.
    pub async fn has(&self, url: &str) -> bool {
        match self.file_path(url) {
            Some(path) => fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Missing or invalid entries are always stale; otherwise stale once the
    /// entry's age reaches `max_age`.
    pub async fn is_stale(&self, url: &str, max_age: Duration) -> bool {
        match self.get(url).await {
            Some(entry) => entry.is_older_than(max_age),
            None => true,
        }
    }

    pub async fn get_metadata(&self, url: &str) -> Option<FeedCacheMetadata> {
        self.get(url).await.map(|entry| FeedCacheMetadata {
            cached_at: entry.cached_at,
            article_count: entry.article_count,
        })
    }

    /// Forget what was read; the next access goes back to disk.
    pub async fn reset(&self) {
        self.snapshot.lock().await.clear();
    }
}
