//! Extractor chain: turns a rendered source page into a list of [`Article`]s.
//!
//! Every source is mapped to one [`ExtractorKind`] through the source registry;
//! unregistered URLs use [`ExtractorKind::Generic`]. Each extractor follows the
//! same two-strategy pattern:
//!
//! 1. **Primary**: scan source-specific container elements (cards, list items)
//!    and read title, link, description, date, image and categories from each.
//! 2. **Fallback**: only when the primary strategy found nothing, scan the
//!    page's anchors and keep the ones whose text looks like a headline.
//!
//! # Supported Sources
//!
//! | Extractor | Module | Containers | Enrichment |
//! |-----------|--------|------------|------------|
//! | `seattle-times` | [`seattle_times`] | `.results-story` | no |
//! | `anthropic` | [`anthropic`] | cards around `/engineering/` links | yes |
//! | `claude-blog` | [`claude_blog`] | Webflow CMS items | yes |
//! | `generic` | [`generic`] | `article`, post/entry classes | no |
//!
//! # Common Guarantees
//!
//! - Links are absolute and unique within one result (first occurrence wins)
//! - At most [`MAX_ARTICLES`] articles; scanning stops as soon as the cap is hit
//! - Titles are cut to [`MAX_TITLE_CHARS`], descriptions to [`MAX_DESCRIPTION_CHARS`]
//! - Missing fields degrade independently; a broken page yields an empty list

pub mod anthropic;
pub mod claude_blog;
pub(crate) mod dom;
pub mod generic;
pub mod seattle_times;

use crate::models::{
    Article, Enrichment, ExtractorKind, MAX_ARTICLES, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS,
};
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Reads one fully rendered article page.
pub type EnrichFn = fn(&Html, &str) -> Enrichment;

static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static FIRST_H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());

impl ExtractorKind {
    /// Run this extractor over a parsed source page.
    pub fn extract(&self, document: &Html, base_url: &str) -> Vec<Article> {
        let articles = match self {
            ExtractorKind::SeattleTimes => seattle_times::extract(document, base_url),
            ExtractorKind::Anthropic => anthropic::extract(document, base_url),
            ExtractorKind::ClaudeBlog => claude_blog::extract(document, base_url),
            ExtractorKind::Generic => generic::extract(document, base_url),
        };
        debug!(extractor = %self, count = articles.len(), "Extracted articles");
        articles
    }

    /// The article-page reader, for extractors that support enrichment.
    pub fn enricher(&self) -> Option<EnrichFn> {
        match self {
            ExtractorKind::Anthropic => Some(anthropic::enrich_article),
            ExtractorKind::ClaudeBlog => Some(claude_blog::enrich_article),
            ExtractorKind::SeattleTimes | ExtractorKind::Generic => None,
        }
    }
}

/// Parse `html` and extract articles with `kind`.
pub fn extract(html: &str, base_url: &str, kind: ExtractorKind) -> Vec<Article> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let document = Html::parse_document(html);
    kind.extract(&document, base_url)
}

/// The page's `<title>`, else its first `<h1>`, else `"RSS Feed"`.
pub fn page_title(document: &Html) -> String {
    [&*PAGE_TITLE, &*FIRST_H1]
        .into_iter()
        .find_map(|sel| document.select(sel).next().and_then(dom::element_text))
        .unwrap_or_else(|| "RSS Feed".to_string())
}

/// Accumulates one extraction pass: dedup by link, cap, truncation.
#[derive(Debug, Default)]
pub(crate) struct ArticleCollector {
    articles: Vec<Article>,
    seen: HashSet<String>,
}

impl ArticleCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.articles.len() >= MAX_ARTICLES
    }

    pub(crate) fn has_seen(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Accept `article` unless its link was already taken or the cap is reached.
    pub(crate) fn push(&mut self, mut article: Article) -> bool {
        if self.is_full() || self.seen.contains(&article.link) {
            return false;
        }
        article.title = truncate_chars(&article.title, MAX_TITLE_CHARS);
        article.description = truncate_chars(&article.description, MAX_DESCRIPTION_CHARS);
        self.seen.insert(article.link.clone());
        self.articles.push(article);
        true
    }

    pub(crate) fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractorKind;
    use std::collections::HashSet;

    #[test]
    fn test_collector_dedups_and_caps() {
        let mut collector = ArticleCollector::new();
        assert!(collector.push(Article::new("First title here", "https://a.example/1")));
        assert!(!collector.push(Article::new("Other title here", "https://a.example/1")));
        for i in 2..40 {
            collector.push(Article::new("Some title", format!("https://a.example/{i}")));
        }
        let articles = collector.into_articles();
        assert_eq!(articles.len(), MAX_ARTICLES);
        assert_eq!(articles[0].title, "First title here");
    }

    #[test]
    fn test_collector_truncates() {
        let mut collector = ArticleCollector::new();
        let mut article = Article::new("t".repeat(450), "https://a.example/x");
        article.description = "d".repeat(900);
        collector.push(article);
        let article = &collector.into_articles()[0];
        assert_eq!(article.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(article.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_extract_empty_or_garbage_html() {
        for kind in [
            ExtractorKind::SeattleTimes,
            ExtractorKind::Anthropic,
            ExtractorKind::ClaudeBlog,
            ExtractorKind::Generic,
        ] {
            assert!(extract("", "https://example.com", kind).is_empty());
            assert!(extract("<<<not html", "https://example.com", kind).is_empty());
        }
    }

    #[test]
    fn test_enrichment_capability_by_kind() {
        assert!(ExtractorKind::Anthropic.enricher().is_some());
        assert!(ExtractorKind::ClaudeBlog.enricher().is_some());
        assert!(ExtractorKind::SeattleTimes.enricher().is_none());
        assert!(ExtractorKind::Generic.enricher().is_none());
    }

    #[test]
    fn test_page_title_fallbacks() {
        let doc = Html::parse_document(
            "<html><head><title> Mariners | Seattle Times </title></head></html>",
        );
        assert_eq!(page_title(&doc), "Mariners | Seattle Times");
        let doc = Html::parse_document("<html><body><h1>Engineering</h1></body></html>");
        assert_eq!(page_title(&doc), "Engineering");
        let doc = Html::parse_document("<html><body><p>none</p></body></html>");
        assert_eq!(page_title(&doc), "RSS Feed");
    }

    #[test]
    fn test_every_extractor_bounds_and_dedups_large_pages() {
        let mut html = String::from("<html><body>");
        for i in 0..60 {
            let n = i % 30;
            html.push_str(&format!(
                r#"<article class="post results-story blog_cms_item card">
                     <div class="results-story-title"><a href="/engineering/blog/story-{n}/">A sufficiently long headline number {n} for every extractor</a></div>
                     <h3 class="card_blog_title">A sufficiently long headline number {n} for every extractor</h3>
                   </article>"#
            ));
        }
        html.push_str("</body></html>");

        for kind in [
            ExtractorKind::SeattleTimes,
            ExtractorKind::Anthropic,
            ExtractorKind::ClaudeBlog,
            ExtractorKind::Generic,
        ] {
            let articles = extract(&html, "https://www.example.com/section/", kind);
            assert!(!articles.is_empty(), "{kind} found nothing");
            assert!(articles.len() <= MAX_ARTICLES);
            let links: HashSet<_> = articles.iter().map(|a| a.link.as_str()).collect();
            assert_eq!(links.len(), articles.len(), "{kind} returned duplicate links");
            assert!(articles.iter().all(|a| a.title.chars().count() <= MAX_TITLE_CHARS));
        }
    }
}
