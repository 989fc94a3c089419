//! Feed assembly: articles in, RSS 2.0 / Atom 1.0 / JSON Feed 1 text out.
//!
//! [`FeedAssembler`] owns the mapping from [`Article`] to a format-neutral
//! [`FeedItem`] plus the channel metadata. The per-format writers only
//! serialize:
//!
//! - [`rss`]: RSS 2.0 with the `cn:readingTime` extension element
//! - [`atom`]: Atom 1.0
//! - [`json`]: JSON Feed 1 with the `_cn` extension object
//!
//! # Discovery links
//!
//! Every format links back to the service at
//! `{base_url}/feed?url={source}&format={rss|atom|json}`.

pub mod atom;
pub mod json;
pub mod rss;

use crate::models::{Article, FeedFormat, GeneratedFeeds};
use crate::utils::upcase;
use chrono::{DateTime, Datelike, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub const GENERATOR: &str = "sitefeed";
/// Namespace of the reading-time extension shared by the RSS and JSON outputs.
pub const CN_NAMESPACE: &str = "https://claudenotes.co/rss-extensions";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid source url {url}: {source}")]
    InvalidSourceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("xml write failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feed body is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Self links for each format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLinks {
    pub rss: String,
    pub atom: String,
    pub json: String,
}

impl FeedLinks {
    pub fn get(&self, format: FeedFormat) -> &str {
        match format {
            FeedFormat::Rss => &self.rss,
            FeedFormat::Atom => &self.atom,
            FeedFormat::Json => &self.json,
        }
    }
}

/// Channel-level metadata shared by all three formats.
#[derive(Debug, Clone)]
pub struct FeedChannel {
    pub title: String,
    pub description: String,
    /// The source page; doubles as the channel id.
    pub link: String,
    pub language: &'static str,
    pub image: Option<String>,
    pub copyright: String,
    pub updated: DateTime<Utc>,
    pub categories: Vec<String>,
    pub links: FeedLinks,
}

/// One entry, already normalized: every optional article field that the
/// formats require has been defaulted.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub link: String,
    /// Description, or the title when the description is empty.
    pub body: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub categories: Vec<String>,
    pub reading_time: Option<u32>,
}

impl FeedItem {
    pub fn from_article(article: &Article, now: DateTime<Utc>) -> Self {
        let id = if article.guid.is_empty() {
            article.link.clone()
        } else {
            article.guid.clone()
        };
        let body = if article.description.is_empty() {
            article.title.clone()
        } else {
            article.description.clone()
        };
        Self {
            id,
            title: article.title.clone(),
            link: article.link.clone(),
            body,
            date: article.pub_date.unwrap_or(now),
            image: article.image_url.clone(),
            categories: article.categories.clone().unwrap_or_default(),
            reading_time: article.reading_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedAssembler {
    base_url: String,
}

impl FeedAssembler {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/feed?url={source}&format={format}`.
    pub fn feed_url(&self, source_url: &str, format: FeedFormat) -> String {
        format!(
            "{}/feed?url={}&format={}",
            self.base_url,
            urlencoding::encode(source_url),
            format
        )
    }

    pub fn feed_links(&self, source_url: &str) -> FeedLinks {
        FeedLinks {
            rss: self.feed_url(source_url, FeedFormat::Rss),
            atom: self.feed_url(source_url, FeedFormat::Atom),
            json: self.feed_url(source_url, FeedFormat::Json),
        }
    }

    pub fn channel(
        &self,
        source_url: &str,
        articles: &[Article],
        page_title: &str,
        now: DateTime<Utc>,
    ) -> Result<FeedChannel, FeedError> {
        let parsed = Url::parse(source_url).map_err(|source| FeedError::InvalidSourceUrl {
            url: source_url.to_string(),
            source,
        })?;
        let host = parsed.host_str().unwrap_or_default();
        let site = site_name(host);
        let title = match page_title.trim() {
            "" => site.clone(),
            t => t.to_string(),
        };

        Ok(FeedChannel {
            title,
            description: format!("Auto-generated feed from {host}"),
            link: source_url.to_string(),
            language: "en",
            image: find_favicon(articles),
            copyright: format!("{} {}", now.year(), site),
            updated: now,
            categories: path_categories(&parsed),
            links: self.feed_links(source_url),
        })
    }

    /// Assemble all three formats for one source.
    #[instrument(level = "info", skip_all, fields(%source_url, count = articles.len()))]
    pub fn generate_feeds(
        &self,
        source_url: &str,
        articles: &[Article],
        page_title: &str,
    ) -> Result<GeneratedFeeds, FeedError> {
        let now = Utc::now();
        let channel = self.channel(source_url, articles, page_title, now)?;
        let items: Vec<FeedItem> = articles
            .iter()
            .map(|a| FeedItem::from_article(a, now))
            .collect();

        let feeds = GeneratedFeeds {
            rss: rss::write(&channel, &items)?,
            atom: atom::write(&channel, &items)?,
            json: json::write(&channel, &items)?,
        };
        debug!(
            rss_bytes = feeds.rss.len(),
            atom_bytes = feeds.atom.len(),
            json_bytes = feeds.json.len(),
            "Generated feeds"
        );
        Ok(feeds)
    }
}

/// First non-`www` label of the host, capitalized: `www.seattletimes.com`
/// gives `Seattletimes`.
pub fn site_name(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    upcase(host.split('.').next().unwrap_or_default())
}

/// The first article image stands in for a channel logo.
pub fn find_favicon(articles: &[Article]) -> Option<String> {
    articles.iter().find_map(|a| a.image_url.clone())
}

/// Path segments as title-cased labels:
/// `/sports/washington-huskies-football/` gives `Sports`,
/// `Washington Huskies Football`.
pub fn path_categories(url: &Url) -> Vec<String> {
    url.path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .split('-')
                .filter(|w| !w.is_empty())
                .map(upcase)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|label| !label.is_empty())
        .collect()
}

/// MIME type for an image enclosure, from the URL's file extension.
pub fn image_mime_type(image_url: &str) -> &'static str {
    let path = Url::parse(image_url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| image_url.to_ascii_lowercase());
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        _ => "image/jpeg",
    }
}

/// `<name>text</name>` with `text` escaped.
pub(crate) fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), FeedError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
