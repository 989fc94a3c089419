//! Anthropic engineering blog (`https://www.anthropic.com/engineering`).
//!
//! The index page has no stable card markup, so the primary strategy starts
//! from every `/engineering/<slug>` link and reads the surrounding card. If
//! the page stops linking under `/engineering/`, the fallback reads any
//! `<article>` that links back into anthropic.com.

use super::ArticleCollector;
use super::dom::{
    categories, closest, date_from, first_non_empty_text, first_text, image_url, is_category_link,
    is_unusable_href, read_article, same_page, text_of,
};
use crate::models::{Article, Enrichment};
use crate::utils::resolve_url;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

const BASE_URL: &str = "https://www.anthropic.com";
const INDEX_URL: &str = "https://www.anthropic.com/engineering";
const MIN_TITLE_CHARS: usize = 10;

static ENGINEERING_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/engineering/"]"#).unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="card"], [class*="article"], [class*="post"], div"#).unwrap()
});
static ANY_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h2, h3, h4, [class*="title"], [class*="heading"]"#).unwrap()
});
static SUMMARY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="summary"], [class*="description"], [class*="excerpt"], p"#).unwrap()
});
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static DATE_TEXT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="date"], [class*="meta"], [class*="published"]"#).unwrap()
});

static POST_BODY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="Body_body"], [class*="post-body"], [class*="article-body"]"#)
        .unwrap()
});
static MAIN_PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article p, main p").unwrap());

pub fn extract(document: &Html, _url: &str) -> Vec<Article> {
    let mut collector = ArticleCollector::new();

    for link in document.select(&ENGINEERING_LINK) {
        if collector.is_full() {
            break;
        }
        let card = closest(link, &ARTICLE).or_else(|| closest(link, &CARD));
        if let Some(article) = read_card(link, card) {
            collector.push(article);
        }
    }

    if collector.is_empty() {
        debug!("No /engineering/ links, scanning <article> elements");
        for card in document.select(&ARTICLE) {
            if collector.is_full() {
                break;
            }
            let Some(link) = card.select(&ANY_LINK).next() else {
                continue;
            };
            if let Some(article) = read_card(link, Some(card)).filter(|a| is_anthropic(&a.link)) {
                collector.push(article);
            }
        }
    }

    collector.into_articles()
}

fn is_anthropic(link: &str) -> bool {
    Url::parse(link)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h == "anthropic.com" || h.ends_with(".anthropic.com"))
        })
        .unwrap_or(false)
}

fn read_card(link: ElementRef<'_>, card: Option<ElementRef<'_>>) -> Option<Article> {
    let href = link.value().attr("href")?;
    if is_unusable_href(href) || is_category_link(href) {
        return None;
    }
    let full_url = resolve_url(Some(href), BASE_URL)?;
    if same_page(&full_url, INDEX_URL) {
        return None;
    }

    let title = card
        .and_then(|c| first_text(c, &TITLE))
        .unwrap_or_else(|| text_of(link));
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }

    let mut article = Article::new(title, full_url);
    if let Some(card) = card {
        article.description = first_non_empty_text(card, &SUMMARY).unwrap_or_default();
        article.pub_date = date_from(card, &TIME, Some(&DATE_TEXT));
        article.image_url = image_url(card, None, BASE_URL);
        article.categories = categories(card);
    }
    Some(article)
}

/// Description and reading time from a rendered engineering post.
pub fn enrich_article(document: &Html, _url: &str) -> Enrichment {
    read_article(document, &POST_BODY, &MAIN_PARAGRAPHS)
}
