//! The feed service: scrape → enrich → assemble → cache, plus the serving and
//! refresh operations built on top of it.
//!
//! # Serving
//!
//! ```text
//! get_feed(url) ──► allow-list ──► memory ──hit──► Hit
//!                                    │ miss
//!                          per-source lock
//!                                    │
//!                         memory / fresh disk ──► Hit / Disk
//!                                    │ miss
//!                   scrape + enrich + assemble ──► Miss (both tiers filled)
//! ```
//!
//! # Refresh
//!
//! Sources are refreshed one after another. A failing source is recorded in
//! its [`RefreshOutcome`] and never stops the batch.
//!
//! Every pipeline run for a source holds that source's lock, so no caller
//! ever observes a half-rebuilt entry as anything but a cache miss.

use crate::cache::{CacheTier, FeedCache, MemoryCache};
use crate::config::{AppConfig, ConfigError, SharedRegistry};
use crate::enricher::{EnrichOptions, enrich_articles};
use crate::models::{Article, ExtractorKind, FeedFormat, GeneratedFeeds, SourceConfig};
use crate::outputs::{FeedAssembler, FeedError};
use crate::renderer::{GotoOptions, RenderError, Renderer, RetryPolicy, render_with_retry};
use crate::scrapers::page_title;
use crate::store::{ArticleStore, FeedStore, StoreError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use scraper::Html;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("This feed URL is not allowed: {0}")]
    NotAllowed(String),

    #[error("No articles found at {0}")]
    NoArticles(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which layer produced a served feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Hit,
    Disk,
    Miss,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Hit => f.write_str("HIT"),
            FeedSource::Disk => f.write_str("DISK"),
            FeedSource::Miss => f.write_str("MISS"),
        }
    }
}

impl From<CacheTier> for FeedSource {
    fn from(tier: CacheTier) -> Self {
        match tier {
            CacheTier::Memory => FeedSource::Hit,
            CacheTier::Disk => FeedSource::Disk,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub body: String,
    pub format: FeedFormat,
    pub content_type: &'static str,
    pub source: FeedSource,
}

/// A rendered and extracted source page.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub page_title: String,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RefreshStatus {
    Success { articles: usize },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub url: String,
    #[serde(flatten)]
    pub status: RefreshStatus,
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RefreshStatus::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub label: String,
    pub url: String,
    pub extractor: ExtractorKind,
    /// Servable without scraping: in memory, or on disk and fresh.
    pub cached: bool,
    pub memory: bool,
    pub disk: bool,
    /// `None` when there is no valid disk entry.
    pub disk_stale: Option<bool>,
    pub disk_cached_at: Option<DateTime<Utc>>,
    pub disk_article_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: Health,
    pub timestamp: DateTime<Utc>,
    pub feeds: Vec<SourceStatus>,
}

/// Lenient `format` query parsing: `rss`, `atom`, `json`, anything else is RSS.
pub fn parse_format(value: Option<&str>) -> FeedFormat {
    FeedFormat::parse_lenient(value)
}

pub struct FeedService<R: Renderer> {
    registry: SharedRegistry,
    renderer: R,
    articles: ArticleStore,
    cache: FeedCache,
    assembler: FeedAssembler,
    goto: GotoOptions,
    retry: RetryPolicy,
    enrich: EnrichOptions,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<R: Renderer> FeedService<R> {
    pub fn new(config: &AppConfig, renderer: R) -> Result<Self, ConfigError> {
        let registry = SharedRegistry::new(config.registry()?);
        let goto = config.render.goto_options();
        let cache = FeedCache::new(
            MemoryCache::from_config(&config.cache),
            FeedStore::new(&config.data_dir, registry.clone()),
            config.cache.max_age(),
        );
        Ok(Self {
            articles: ArticleStore::new(&config.data_dir),
            cache,
            assembler: FeedAssembler::new(config.base_url.as_str()),
            retry: RetryPolicy::new(
                config.scrape.retries,
                Duration::from_millis(config.scrape.base_delay_ms),
            ),
            enrich: EnrichOptions {
                delay: Duration::from_millis(config.enrichment.delay_ms),
                goto: goto.clone(),
            },
            goto,
            registry,
            renderer,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_enrich_options(mut self, enrich: EnrichOptions) -> Self {
        self.enrich = enrich;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn article_store(&self) -> &ArticleStore {
        &self.articles
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.registry.read().contains(url)
    }

    fn source_lock(&self, url: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(url.to_string()).or_default())
    }

    /// Render a source page and extract its articles. Unknown publication
    /// dates are set to now.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn scrape(&self, url: &str) -> Result<ScrapeResult, PipelineError> {
        let kind = self.registry.read().extractor_for(url);
        let html = render_with_retry(&self.renderer, url, &self.goto, &self.retry).await?;

        let (title, mut articles) = {
            let document = Html::parse_document(&html);
            (page_title(&document), kind.extract(&document, url))
        };

        let now = Utc::now();
        for article in &mut articles {
            article.pub_date.get_or_insert(now);
        }
        info!(count = articles.len(), extractor = %kind, "Scraped source page");
        Ok(ScrapeResult {
            page_title: title,
            articles,
        })
    }

    /// Scrape, enrich, assemble and store. Caller holds the source lock.
    async fn rebuild(&self, url: &str) -> Result<(Arc<GeneratedFeeds>, usize), PipelineError> {
        let ScrapeResult {
            page_title,
            mut articles,
        } = self.scrape(url).await?;
        if articles.is_empty() {
            return Err(PipelineError::NoArticles(url.to_string()));
        }

        let kind = self.registry.read().extractor_for(url);
        enrich_articles(
            url,
            kind,
            &mut articles,
            &self.renderer,
            &self.articles,
            &self.enrich,
        )
        .await;

        let feeds = Arc::new(self.assembler.generate_feeds(url, &articles, &page_title)?);
        let count = articles.len();
        if let Err(e) = self.cache.set(url, Arc::clone(&feeds), count).await {
            error!(%url, error = %e, "Failed to persist feeds; serving from memory only");
        }
        Ok((feeds, count))
    }

    /// Serve one source's feed in `format`, scraping only when neither cache
    /// tier can answer.
    #[instrument(level = "info", skip_all, fields(%url, %format))]
    pub async fn get_feed(
        &self,
        url: &str,
        format: FeedFormat,
    ) -> Result<FeedResponse, PipelineError> {
        if !self.is_allowed(url) {
            return Err(PipelineError::NotAllowed(url.to_string()));
        }
        let respond = |feeds: &GeneratedFeeds, source: FeedSource| FeedResponse {
            body: feeds.body(format).to_string(),
            format,
            content_type: format.content_type(),
            source,
        };

        if let Some(feeds) = self.cache.memory().get(url) {
            info!("Serving memory-cached feed");
            return Ok(respond(feeds.as_ref(), FeedSource::Hit));
        }

        let lock = self.source_lock(url);
        let _guard = lock.lock().await;
        if let Some((feeds, tier)) = self.cache.get(url).await {
            info!(%tier, "Serving cached feed");
            return Ok(respond(feeds.as_ref(), tier.into()));
        }

        info!("Cache miss, scraping");
        let (feeds, _) = self.rebuild(url).await?;
        Ok(respond(feeds.as_ref(), FeedSource::Miss))
    }

    async fn refresh_one(&self, url: String) -> RefreshOutcome {
        let lock = self.source_lock(&url);
        let _guard = lock.lock().await;
        self.cache.invalidate(&url);

        let status = match self.rebuild(&url).await {
            Ok((_, articles)) => {
                info!(%url, articles, "Successfully refreshed feed");
                RefreshStatus::Success { articles }
            }
            Err(e) => {
                warn!(%url, error = %e, "Error refreshing feed");
                RefreshStatus::Error {
                    message: e.to_string(),
                }
            }
        };
        RefreshOutcome { url, status }
    }

    /// Re-scrape one source, or every registered source in order.
    ///
    /// `force` first drops every cached reading time and saves the store.
    /// Articles with a cached description are not fetched again, so they
    /// come back without a reading time.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh(
        &self,
        url: Option<&str>,
        force: bool,
    ) -> Result<Vec<RefreshOutcome>, PipelineError> {
        if let Some(url) = url {
            if !self.is_allowed(url) {
                return Err(PipelineError::NotAllowed(url.to_string()));
            }
        }

        if force {
            let cleared = self.articles.clear_reading_times().await;
            self.articles.save().await?;
            info!(cleared, "Force refresh: cleared cached reading times");
        }

        let targets = match url {
            Some(url) => vec![url.to_string()],
            None => self.registry.read().urls(),
        };
        let outcomes: Vec<RefreshOutcome> = stream::iter(targets)
            .then(|url| self.refresh_one(url))
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            total = outcomes.len(),
            succeeded,
            failed = outcomes.len() - succeeded,
            "Feed refresh completed"
        );
        Ok(outcomes)
    }

    /// Cache state of every registered source.
    pub async fn status(&self) -> StatusReport {
        let sources: Vec<SourceConfig> = self.registry.read().iter().cloned().collect();
        let mut feeds = Vec::with_capacity(sources.len());
        for source in sources {
            let memory = self.cache.memory().contains(&source.url);
            let metadata = self.cache.get_metadata(&source.url).await;
            let disk_stale = match &metadata {
                Some(_) => Some(self.cache.is_stale(&source.url, None).await),
                None => None,
            };
            feeds.push(SourceStatus {
                cached: memory || disk_stale == Some(false),
                memory,
                disk: metadata.is_some(),
                disk_stale,
                disk_cached_at: metadata.as_ref().map(|m| m.cached_at),
                disk_article_count: metadata.as_ref().map(|m| m.article_count),
                label: source.label,
                url: source.url,
                extractor: source.extractor,
            });
        }

        let status = if feeds.iter().all(|f| f.cached) {
            Health::Healthy
        } else {
            Health::Degraded
        };
        debug!(?status, sources = feeds.len(), "Built status report");
        StatusReport {
            status,
            timestamp: Utc::now(),
            feeds,
        }
    }

    pub fn sources(&self) -> Vec<SourceConfig> {
        self.registry.read().iter().cloned().collect()
    }

    /// Register a source for this process; `false` if its url or label is taken.
    pub fn add_source(&self, source: SourceConfig) -> bool {
        let url = source.url.clone();
        let added = self.registry.write().add(source);
        if added {
            info!(%url, "Added feed");
        }
        added
    }

    /// Unregister a source and drop its memory entry.
    pub fn remove_source(&self, url: &str) -> bool {
        let removed = self.registry.write().remove(url);
        if removed {
            self.cache.invalidate(url);
            info!(%url, "Removed feed");
        }
        removed
    }

    /// Release the shared renderer.
    pub async fn close(&self) {
        self.renderer.close().await;
    }
}
