//! Tier 1: bounded in-memory TTL cache of assembled feeds.
//!
//! Keys are `feed:<source url>`. Values are shared `Arc`s, so a hit never
//! copies the feed bodies. The cache holds nothing that cannot be rebuilt
//! from the feed store or a fresh scrape.

use crate::config::CacheConfig;
use crate::models::GeneratedFeeds;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, Arc<GeneratedFeeds>>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl MemoryCache {
    pub fn new(max_keys: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_keys)
            .time_to_live(ttl)
            .eviction_listener(|key: Arc<String>, _value: Arc<GeneratedFeeds>, cause| match cause {
                RemovalCause::Expired => info!(%key, "Cache expired for key"),
                RemovalCause::Size => debug!(%key, "Cache evicted key at capacity"),
                RemovalCause::Explicit | RemovalCause::Replaced => {}
            })
            .build();
        Self { inner }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_keys, config.ttl())
    }

    pub fn key(url: &str) -> String {
        format!("feed:{url}")
    }

    pub fn get(&self, url: &str) -> Option<Arc<GeneratedFeeds>> {
        self.inner.get(&Self::key(url))
    }

    pub fn set(&self, url: &str, feeds: Arc<GeneratedFeeds>) {
        self.inner.insert(Self::key(url), feeds);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains_key(&Self::key(url))
    }

    pub fn invalidate(&self, url: &str) {
        self.inner.invalidate(&Self::key(url));
    }

    /// Entries currently held; exact only right after [`MemoryCache::sweep`].
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict expired entries and apply pending capacity bookkeeping now.
    pub fn sweep(&self) {
        self.inner.run_pending_tasks();
    }

    /// Sweep every `every` on the current runtime until the handle is aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.sweep();
                debug!(entries = cache.len(), "Swept memory cache");
            }
        })
    }
}
