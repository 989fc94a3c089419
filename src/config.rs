//! Application configuration and the source registry.
//!
//! Configuration is read from an optional YAML file. Every key has a default,
//! so a missing file, an empty file or a partial file all produce a usable
//! [`AppConfig`]. The built-in source list is used when `sources` is omitted.

use crate::models::{ExtractorKind, SourceConfig};
use crate::renderer::{GotoOptions, WaitUntil};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML in config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Source URL configured twice: {0}")]
    DuplicateUrl(String),

    #[error("Source label configured twice: {0}")]
    DuplicateLabel(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `articles.json` and `feeds/<label>.json`.
    pub data_dir: PathBuf,
    /// Public base URL used to build self-referencing feed links.
    pub base_url: String,
    pub render: RenderConfig,
    pub scrape: ScrapeConfig,
    pub enrichment: EnrichmentConfig,
    pub cache: CacheConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            base_url: "http://localhost:3000".to_string(),
            render: RenderConfig::default(),
            scrape: ScrapeConfig::default(),
            enrichment: EnrichmentConfig::default(),
            cache: CacheConfig::default(),
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub timeout_secs: u64,
    /// Extra time given to client-side scripts after navigation settles.
    pub settle_ms: u64,
    pub user_agent: String,
    pub wait_until: WaitUntil,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            settle_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            wait_until: WaitUntil::NetworkIdle,
        }
    }
}

impl RenderConfig {
    pub fn goto_options(&self) -> GotoOptions {
        GotoOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            wait_until: self.wait_until,
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Extra attempts made when a source page fails to render.
    pub retries: usize,
    pub base_delay_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Pause between article page fetches once something has been enriched.
    pub delay_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { delay_ms: 1500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_keys: u64,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    /// Age after which a disk-cached feed is stale.
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_keys: 100,
            ttl_secs: 86_400,
            sweep_interval_secs: 3_600,
            max_age_secs: 86_400,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// The sources scraped when no configuration overrides them.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "https://www.seattletimes.com/sports/washington-huskies-football/",
            ExtractorKind::SeattleTimes,
            "huskies",
        ),
        SourceConfig::new(
            "https://www.seattletimes.com/sports/mariners/",
            ExtractorKind::SeattleTimes,
            "mariners",
        ),
        SourceConfig::new(
            "https://www.anthropic.com/engineering",
            ExtractorKind::Anthropic,
            "anthropic-engineering",
        ),
        SourceConfig::new("https://claude.com/blog", ExtractorKind::ClaudeBlog, "claude-blog"),
    ]
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// - Missing file → `Ok(AppConfig::default())`
    /// - Empty file → `Ok(AppConfig::default())`
    /// - Invalid YAML → `Err(ConfigError::Parse)`
    /// - Duplicate source url or label → `Err(ConfigError::Duplicate*)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(content)?;
        SourceRegistry::new(config.sources.clone())?;
        Ok(config)
    }

    pub fn registry(&self) -> Result<SourceRegistry, ConfigError> {
        SourceRegistry::new(self.sources.clone())
    }
}

/// Ordered list of configured sources with unique urls and labels.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceConfig>,
}

/// The working-copy registry shared by the service and the feed store.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry(Arc<RwLock<SourceRegistry>>);

impl SharedRegistry {
    pub fn new(registry: SourceRegistry) -> Self {
        Self(Arc::new(RwLock::new(registry)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SourceRegistry> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SourceRegistry> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn label_for(&self, url: &str) -> Option<String> {
        self.read().label_for(url).map(str::to_string)
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> Result<Self, ConfigError> {
        let mut urls = HashSet::new();
        let mut labels = HashSet::new();
        for source in &sources {
            if !urls.insert(source.url.as_str()) {
                return Err(ConfigError::DuplicateUrl(source.url.clone()));
            }
            if !labels.insert(source.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(source.label.clone()));
            }
        }
        Ok(Self { sources })
    }

    pub fn find(&self, url: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    pub fn label_for(&self, url: &str) -> Option<&str> {
        self.find(url).map(|s| s.label.as_str())
    }

    /// Extractor for `url`; unregistered urls use the generic extractor.
    pub fn extractor_for(&self, url: &str) -> ExtractorKind {
        self.find(url).map(|s| s.extractor).unwrap_or_default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.url.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Add a source; returns `false` when its url or label is already taken.
    pub fn add(&mut self, source: SourceConfig) -> bool {
        let taken = self
            .sources
            .iter()
            .any(|s| s.url == source.url || s.label == source.label);
        if taken {
            return false;
        }
        self.sources.push(source);
        true
    }

    /// Remove the source registered for `url`; returns `false` if there was none.
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.url != url);
        self.sources.len() != before
    }
}
