//! Durable JSON stores under the data directory.
//!
//! ```text
//! data_dir/
//! ├── articles.json          # ArticleStore: article URL -> enrichment
//! └── feeds/
//!     ├── mariners.json      # FeedStore: one file per source label
//!     └── claude-blog.json
//! ```
//!
//! Both stores load lazily, keep the parsed data in memory, and persist with
//! write-temp-then-rename so the canonical file is never partially written.
//! Unreadable files are logged and treated as empty.

pub mod articles;
pub mod feeds;

pub use articles::ArticleStore;
pub use feeds::FeedStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize store data: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize `value` to `tmp`, then rename it over `path`.
///
/// The parent directory is created if missing. On a failed rename the
/// temporary file is removed.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    tmp: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;
    }

    fs::write(tmp, json).await.map_err(|e| StoreError::io(tmp, e))?;
    if let Err(e) = fs::rename(tmp, path).await {
        let _ = fs::remove_file(tmp).await;
        return Err(StoreError::io(path, e));
    }
    debug!(path = %path.display(), "Wrote store file");
    Ok(())
}

/// Read and parse `path`. Missing, unreadable and unparseable files are all
/// `None`; the latter two are logged.
pub(crate) async fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read store file");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse store file");
            None
        }
    }
}
