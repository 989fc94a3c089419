//! Best-effort extractor for unregistered sites.
//!
//! Looks for blog-shaped containers (`<article>`, `.post`, `.entry`, ...)
//! first. As a last resort every anchor with headline-length text is taken
//! as an article, which keeps nav and footer noise out by length alone.

use super::ArticleCollector;
use super::dom::{
    categories, date_from, first_non_empty_text, first_text, image_url, is_category_link,
    is_unusable_href, parent_element, same_page, text_of,
};
use crate::models::Article;
use crate::utils::resolve_url;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const MIN_CONTAINER_TITLE_CHARS: usize = 10;
const MIN_LINK_TITLE_CHARS: usize = 25;

static CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"article, [class*="post"], [class*="entry"], [class*="article"]"#).unwrap()
});
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h2, h3, h4, [class*="title"], [class*="headline"]"#).unwrap()
});
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="excerpt"], [class*="summary"], [class*="description"], p"#).unwrap()
});
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

pub fn extract(document: &Html, url: &str) -> Vec<Article> {
    let mut collector = ArticleCollector::new();

    for item in document.select(&CONTAINER) {
        if collector.is_full() {
            break;
        }
        let Some(link) = item.select(&LINK).next() else {
            continue;
        };
        let Some(full_url) = article_url(link, url) else {
            continue;
        };
        if collector.has_seen(&full_url) {
            continue;
        }

        let title = first_text(item, &TITLE).unwrap_or_else(|| text_of(link));
        if title.chars().count() < MIN_CONTAINER_TITLE_CHARS {
            continue;
        }

        let mut article = Article::new(title, full_url);
        article.description = first_non_empty_text(item, &DESCRIPTION).unwrap_or_default();
        article.pub_date = date_from(item, &TIME, None);
        article.image_url = image_url(item, None, url);
        article.categories = categories(item);
        collector.push(article);
    }

    if collector.is_empty() {
        debug!(%url, "No article containers, scanning links");
        for link in document.select(&LINK) {
            if collector.is_full() {
                break;
            }
            let Some(full_url) = article_url(link, url) else {
                continue;
            };
            if collector.has_seen(&full_url) {
                continue;
            }
            let title = text_of(link);
            if title.chars().count() < MIN_LINK_TITLE_CHARS {
                continue;
            }
            let mut article = Article::new(title, full_url);
            article.description = nearby_paragraph(link).unwrap_or_default();
            collector.push(article);
        }
    }

    collector.into_articles()
}

fn article_url(link: ElementRef<'_>, page_url: &str) -> Option<String> {
    let href = link.value().attr("href")?;
    if is_unusable_href(href) || is_category_link(href) {
        return None;
    }
    let full_url = resolve_url(Some(href), page_url)?;
    (!same_page(&full_url, page_url)).then_some(full_url)
}

fn nearby_paragraph(link: ElementRef<'_>) -> Option<String> {
    let parent = parent_element(link)?;
    first_non_empty_text(parent, &PARAGRAPH)
}
