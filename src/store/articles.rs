//! Durable enrichment results keyed by article URL.
//!
//! The in-memory map is the write buffer: setters only touch memory, and
//! [`ArticleStore::save`] persists the whole map in one atomic write. The
//! enricher calls `save` once per batch.

use super::{StoreError, read_json_lenient, write_json_atomic};
use crate::models::ArticleStoreEntry;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, instrument};

pub const STORE_FILE: &str = "articles.json";
const STORE_TMP: &str = "articles.tmp.json";

type Entries = BTreeMap<String, ArticleStoreEntry>;

#[derive(Debug)]
pub struct ArticleStore {
    path: PathBuf,
    tmp_path: PathBuf,
    /// `None` until first access.
    snapshot: Mutex<Option<Entries>>,
}

impl ArticleStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            path: data_dir.join(STORE_FILE),
            tmp_path: data_dir.join(STORE_TMP),
            snapshot: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store; unreadable ones are logged by
    /// `read_json_lenient`.
    async fn load(&self) -> Entries {
        read_json_lenient(&self.path).await.unwrap_or_default()
    }

    async fn with_entries<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> R {
        let mut snapshot = self.snapshot.lock().await;
        if snapshot.is_none() {
            *snapshot = Some(self.load().await);
        }
        f(snapshot.get_or_insert_with(Entries::new))
    }

    pub async fn get(&self, url: &str) -> Option<ArticleStoreEntry> {
        self.with_entries(|entries| entries.get(url).cloned()).await
    }

    pub async fn get_description(&self, url: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(url).map(|e| e.description.clone()))
            .await
    }

    /// Whether a non-empty description is cached for `url`.
    pub async fn has_description(&self, url: &str) -> bool {
        self.with_entries(|entries| entries.get(url).is_some_and(|e| !e.description.is_empty()))
            .await
    }

    pub async fn get_reading_time(&self, url: &str) -> Option<u32> {
        self.with_entries(|entries| entries.get(url).and_then(|e| e.reading_time))
            .await
    }

    /// Set the description, keeping any cached reading time.
    pub async fn set_description(&self, url: &str, description: impl Into<String>) {
        let description = description.into();
        self.with_entries(|entries| {
            let reading_time = entries.get(url).and_then(|e| e.reading_time);
            entries.insert(
                url.to_string(),
                ArticleStoreEntry {
                    description,
                    reading_time,
                    fetched_at: Utc::now(),
                },
            );
        })
        .await
    }

    /// Replace everything cached for `url`.
    pub async fn set_article_data(
        &self,
        url: &str,
        description: impl Into<String>,
        reading_time: Option<u32>,
    ) {
        let entry = ArticleStoreEntry {
            description: description.into(),
            reading_time,
            fetched_at: Utc::now(),
        };
        self.with_entries(|entries| {
            entries.insert(url.to_string(), entry);
        })
        .await
    }

    /// Drop every cached reading time so the next refresh re-enriches.
    /// Returns how many entries had one.
    pub async fn clear_reading_times(&self) -> usize {
        self.with_entries(|entries| {
            entries
                .values_mut()
                .filter_map(|e| e.reading_time.take())
                .count()
        })
        .await
    }

    pub async fn len(&self) -> usize {
        self.with_entries(|entries| entries.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Persist the in-memory map with write-temp-then-rename.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self) -> Result<(), StoreError> {
        let mut snapshot = self.snapshot.lock().await;
        if snapshot.is_none() {
            *snapshot = Some(self.load().await);
        }
        let entries = snapshot.get_or_insert_with(Entries::new);
        write_json_atomic(&self.path, &self.tmp_path, entries).await?;
        info!(count = entries.len(), "Saved article store");
        Ok(())
    }

    /// Forget the in-memory snapshot; the next access reloads from disk.
    pub async fn reset(&self) {
        *self.snapshot.lock().await = None;
    }
}
