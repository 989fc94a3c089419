//! Seattle Times section pages (`/sports/mariners/`, `/sports/uw-huskies/`, ...).
//!
//! Section pages list stories as `.results-story` blocks. Older layouts are
//! picked up by the fallback, which looks for story containers holding a
//! dated article link (`/2026/`, `/2025/`, ...).

use super::ArticleCollector;
use super::dom::{
    categories, date_from, element_text, first_non_empty_text, first_text, image_url,
    is_category_link, is_unusable_href, same_page, text_of,
};
use crate::models::Article;
use crate::utils::resolve_url;
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const MIN_FALLBACK_TITLE_CHARS: usize = 10;

static STORY: Lazy<Selector> = Lazy::new(|| Selector::parse(".results-story").unwrap());
static STORY_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".results-story-title a").unwrap());
static STORY_EXCERPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".results-story-excerpt").unwrap());
static STORY_TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".results-story-date time").unwrap());
static STORY_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(".results-story-date").unwrap());
static STORY_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".results-story-image img").unwrap());

static FALLBACK_CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"[class*="results-story"], [class*="story-list"] article, article[class*="story"]"#,
    )
    .unwrap()
});
static FALLBACK_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h2, h3, [class*="title"], [class*="headline"]"#).unwrap());
static FALLBACK_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="excerpt"], [class*="summary"], p"#).unwrap());
static FALLBACK_TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static FALLBACK_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"[class*="date"]"#).unwrap());

pub fn extract(document: &Html, url: &str) -> Vec<Article> {
    let mut collector = ArticleCollector::new();

    for story in document.select(&STORY) {
        if collector.is_full() {
            break;
        }
        if let Some(article) = read_story(story, url) {
            collector.push(article);
        }
    }

    if collector.is_empty() {
        debug!(%url, "No .results-story blocks, trying dated links");
        fallback(document, url, &mut collector);
    }

    collector.into_articles()
}

fn read_story(story: ElementRef<'_>, url: &str) -> Option<Article> {
    let link = story.select(&STORY_LINK).next()?;
    let title = element_text(link)?;
    let full_url = story_url(link, url)?;

    let mut article = Article::new(title, full_url);
    article.description = first_text(story, &STORY_EXCERPT).unwrap_or_default();
    article.pub_date = date_from(story, &STORY_TIME, Some(&STORY_DATE));
    article.image_url = image_url(story, Some(&STORY_IMAGE), url);
    article.categories = categories(story);
    Some(article)
}

/// Absolute URL of a story link; the section index itself, category and
/// filter pages, and script or anchor hrefs are `None`.
fn story_url(link: ElementRef<'_>, page_url: &str) -> Option<String> {
    let href = link.value().attr("href")?;
    if is_unusable_href(href) || is_category_link(href) {
        return None;
    }
    let full_url = resolve_url(Some(href), page_url)?;
    (!same_page(&full_url, page_url)).then_some(full_url)
}

/// Links whose path carries this year or one of the two before it.
fn dated_link_selector() -> Option<Selector> {
    let year = Utc::now().year();
    let selector = (0..3)
        .map(|back| format!(r#"a[href*="/{}/"]"#, year - back))
        .collect::<Vec<_>>()
        .join(", ");
    Selector::parse(&selector).ok()
}

fn fallback(document: &Html, url: &str, collector: &mut ArticleCollector) {
    let Some(dated_link) = dated_link_selector() else {
        return;
    };

    for story in document.select(&FALLBACK_CONTAINER) {
        if collector.is_full() {
            break;
        }
        let Some(link) = story.select(&dated_link).next() else {
            continue;
        };
        let Some(full_url) = resolve_url(link.value().attr("href"), url) else {
            continue;
        };
        if collector.has_seen(&full_url) {
            continue;
        }

        let title = first_text(story, &FALLBACK_TITLE).unwrap_or_else(|| text_of(link));
        if title.chars().count() < MIN_FALLBACK_TITLE_CHARS {
            continue;
        }

        let mut article = Article::new(title, full_url);
        article.description =
            first_non_empty_text(story, &FALLBACK_DESCRIPTION).unwrap_or_default();
        article.pub_date = date_from(story, &FALLBACK_TIME, Some(&FALLBACK_DATE));
        article.image_url = image_url(story, None, url);
        collector.push(article);
    }
}
