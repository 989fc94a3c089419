//! Data models for scraped articles, configured sources and generated feeds.
//!
//! - [`Article`]: one content item discovered on a source page
//! - [`SourceConfig`] / [`ExtractorKind`]: the static source registry entries
//! - [`Enrichment`]: what a second, per-article page fetch produced
//! - [`GeneratedFeeds`] / [`FeedFormat`]: the three serialized feed bodies
//! - [`ArticleStoreEntry`] / [`FeedCacheEntry`]: persisted records
//!
//! Persisted records use camelCase field names so the on-disk JSON stays
//! compatible with files written by earlier deployments.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Maximum title length kept after extraction, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Maximum description length kept after extraction, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Maximum number of articles a single extraction pass may return.
pub const MAX_ARTICLES: usize = 20;

/// A content item discovered on a source page.
///
/// Within one extraction result `link` values are unique and the list keeps
/// source-document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Headline, at most [`MAX_TITLE_CHARS`] characters, never empty.
    pub title: String,
    /// Absolute URL of the article page.
    pub link: String,
    /// Summary text, at most [`MAX_DESCRIPTION_CHARS`] characters, may be empty.
    pub description: String,
    /// Publication instant, `None` when the page did not carry a usable date.
    pub pub_date: Option<DateTime<Utc>>,
    /// Absolute URL of the lead image.
    pub image_url: Option<String>,
    /// Stable identifier, defaults to `link`.
    pub guid: String,
    /// Estimated reading time in minutes (≥ 1).
    pub reading_time: Option<u32>,
    /// Category labels in order of first appearance; never an empty list.
    pub categories: Option<Vec<String>>,
}

impl Article {
    /// Create an article whose guid is its link and whose optional fields are unset.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        let link = link.into();
        Self {
            title: title.into(),
            guid: link.clone(),
            link,
            description: String::new(),
            pub_date: None,
            image_url: None,
            reading_time: None,
            categories: None,
        }
    }
}

/// The extractor implementation a source is scraped with.
///
/// Unknown names in configuration fall back to [`ExtractorKind::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    SeattleTimes,
    Anthropic,
    ClaudeBlog,
    #[default]
    #[serde(other)]
    Generic,
}

impl ExtractorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::SeattleTimes => "seattle-times",
            ExtractorKind::Anthropic => "anthropic",
            ExtractorKind::ClaudeBlog => "claude-blog",
            ExtractorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured source page.
///
/// `url` and `label` are each unique across the registry. The label names the
/// source's feed-cache file and is the human-facing slug.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub extractor: ExtractorKind,
    pub label: String,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, extractor: ExtractorKind, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extractor,
            label: label.into(),
        }
    }
}

/// Best-effort result of reading a single article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub description: Option<String>,
    pub reading_time: Option<u32>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.reading_time.is_none()
    }
}

/// Output format of a generated feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    #[default]
    Rss,
    Atom,
    Json,
}

impl FeedFormat {
    pub const ALL: [FeedFormat; 3] = [FeedFormat::Rss, FeedFormat::Atom, FeedFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
            FeedFormat::Json => "json",
        }
    }

    /// HTTP content type for a body in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "application/rss+xml; charset=utf-8",
            FeedFormat::Atom => "application/atom+xml; charset=utf-8",
            FeedFormat::Json => "application/feed+json; charset=utf-8",
        }
    }

    /// Lenient parse used for query parameters: anything unrecognized is RSS.
    pub fn parse_lenient(value: Option<&str>) -> FeedFormat {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss" => Ok(FeedFormat::Rss),
            "atom" => Ok(FeedFormat::Atom),
            "json" => Ok(FeedFormat::Json),
            other => Err(format!("unknown feed format: {other}")),
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three serialized bodies of one assembled feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratedFeeds {
    pub rss: String,
    pub atom: String,
    pub json: String,
}

impl GeneratedFeeds {
    pub fn body(&self, format: FeedFormat) -> &str {
        match format {
            FeedFormat::Rss => &self.rss,
            FeedFormat::Atom => &self.atom,
            FeedFormat::Json => &self.json,
        }
    }
}

/// Persisted enrichment result for one article URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStoreEntry {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    pub fetched_at: DateTime<Utc>,
}

/// Persisted feed bodies for one source, keyed on disk by the source label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCacheEntry {
    pub feeds: GeneratedFeeds,
    pub source_url: String,
    pub article_count: usize,
    pub cached_at: DateTime<Utc>,
}

impl FeedCacheEntry {
    /// Whether the entry's age has reached `max_age`.
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        Utc::now() - self.cached_at >= max_age
    }
}

/// Age and size of a cached feed, without the bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCacheMetadata {
    pub cached_at: DateTime<Utc>,
    pub article_count: usize,
}
