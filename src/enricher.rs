//! Enrichment: fill in missing descriptions and reading times by visiting
//! each article's own page.
//!
//! Articles are processed sequentially in list order:
//!
//! 1. Sources whose extractor cannot read article pages are skipped outright.
//! 2. A non-empty description in the [`ArticleStore`] is a cache hit: it (and
//!    any cached reading time) fills the article's empty fields, no fetch.
//! 3. Otherwise the article page is rendered and read. Anything found is
//!    stored and copied onto the article's still-empty fields.
//! 4. A failed fetch is logged and the batch moves on.
//! 5. Once something has been enriched, each further fetch waits
//!    `EnrichOptions::delay` first. Cache hits never wait.
//! 6. The store is saved once at the end if anything was enriched.

use crate::models::{Article, ExtractorKind};
use crate::renderer::{GotoOptions, Renderer, render_page};
use crate::store::ArticleStore;
use scraper::Html;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Pause before each fetch after the first successful enrichment.
    pub delay: Duration,
    pub goto: GotoOptions,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
            goto: GotoOptions::default(),
        }
    }
}

/// What one batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub cache_hits: usize,
    pub fetched: usize,
    pub enriched: usize,
    pub failed: usize,
}

#[instrument(
    level = "info",
    skip_all,
    fields(%source_url, extractor = %kind, count = articles.len())
)]
pub async fn enrich_articles<R: Renderer>(
    source_url: &str,
    kind: ExtractorKind,
    articles: &mut [Article],
    renderer: &R,
    store: &ArticleStore,
    options: &EnrichOptions,
) -> EnrichReport {
    let mut report = EnrichReport::default();
    let Some(read_page) = kind.enricher() else {
        debug!("Extractor does not enrich, skipping");
        return report;
    };

    for article in articles.iter_mut() {
        let cached = store
            .get(&article.link)
            .await
            .filter(|entry| !entry.description.is_empty());
        if let Some(entry) = cached {
            if article.description.is_empty() {
                article.description = entry.description;
            }
            if article.reading_time.is_none() {
                article.reading_time = entry.reading_time;
            }
            report.cache_hits += 1;
            continue;
        }

        if report.fetched > 0 && report.enriched > 0 {
            sleep(options.delay).await;
        }
        report.fetched += 1;

        let html = match render_page(renderer, &article.link, &options.goto).await {
            Ok(html) => html,
            Err(e) => {
                warn!(link = %article.link, error = %e, "Enrichment failed");
                report.failed += 1;
                continue;
            }
        };
        let enrichment = read_page(&Html::parse_document(&html), &article.link);
        if enrichment.is_empty() {
            debug!(link = %article.link, "Article page had nothing to add");
            continue;
        }

        store
            .set_article_data(
                &article.link,
                enrichment.description.clone().unwrap_or_default(),
                enrichment.reading_time,
            )
            .await;
        if article.description.is_empty() {
            if let Some(description) = enrichment.description {
                article.description = description;
            }
        }
        if article.reading_time.is_none() {
            article.reading_time = enrichment.reading_time;
        }
        report.enriched += 1;
    }

    if report.enriched > 0 {
        if let Err(e) = store.save().await {
            error!(error = %e, "Failed to save article store");
        }
        info!(
            enriched = report.enriched,
            cache_hits = report.cache_hits,
            failed = report.failed,
            "Enriched articles"
        );
    }
    report
}
