//! Two-tier feed cache.
//!
//! ```text
//! get(url) ──► MemoryCache ──hit──► (feeds, Memory)
//!                  │ miss
//!                  ▼
//!              FeedStore ──fresh──► promote to memory ──► (feeds, Disk)
//!                  │ missing / invalid / stale
//!                  ▼
//!                 None
//! ```
//!
//! Writes go to both tiers. The memory tier is an overlay only; dropping it
//! loses nothing but warm-up time.

pub mod memory;

pub use memory::MemoryCache;

use crate::models::{FeedCacheMetadata, GeneratedFeeds};
use crate::store::{FeedStore, StoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Memory => f.write_str("memory"),
            CacheTier::Disk => f.write_str("disk"),
        }
    }
}

#[derive(Debug)]
pub struct FeedCache {
    memory: MemoryCache,
    disk: FeedStore,
    max_age: Duration,
}

impl FeedCache {
    /// `max_age` is the disk staleness threshold used by [`FeedCache::get`].
    pub fn new(memory: MemoryCache, disk: FeedStore, max_age: Duration) -> Self {
        Self {
            memory,
            disk,
            max_age,
        }
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> &FeedStore {
        &self.disk
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub async fn get(&self, url: &str) -> Option<(Arc<GeneratedFeeds>, CacheTier)> {
        if let Some(feeds) = self.memory.get(url) {
            return Some((feeds, CacheTier::Memory));
        }

        let entry = self.disk.get(url).await?;
        if entry.is_older_than(self.max_age) {
            debug!(%url, cached_at = %entry.cached_at, "Disk cache stale");
            return None;
        }
        let feeds = Arc::new(entry.feeds);
        self.memory.set(url, Arc::clone(&feeds));
        debug!(%url, "Promoted disk cache entry to memory");
        Some((feeds, CacheTier::Disk))
    }

    /// Store in both tiers. The memory tier is updated even when the disk
    /// write fails; the error is still returned.
    pub async fn set(
        &self,
        url: &str,
        feeds: Arc<GeneratedFeeds>,
        article_count: usize,
    ) -> Result<(), StoreError> {
        self.memory.set(url, Arc::clone(&feeds));
        self.disk.set(url, &feeds, article_count).await
    }

    /// Drop the memory entry; the disk entry stays until overwritten.
    pub fn invalidate(&self, url: &str) {
        self.memory.invalidate(url);
    }

    /// Disk staleness against `max_age`, or the cache's own threshold.
    pub async fn is_stale(&self, url: &str, max_age: Option<Duration>) -> bool {
        self.disk.is_stale(url, max_age.unwrap_or(self.max_age)).await
    }

    pub async fn get_metadata(&self, url: &str) -> Option<FeedCacheMetadata> {
        self.disk.get_metadata(url).await
    }
}
