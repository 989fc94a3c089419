//! Small DOM helpers shared by the extractors.

use crate::models::{Enrichment, MAX_DESCRIPTION_CHARS};
use crate::utils::{
    collapse_whitespace, estimate_reading_time, parse_date, resolve_url, truncate_chars,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static CATEGORY_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)/(category|categories|tag|tags|topic|topics)/|[?&](category|tag|topic|filter)=",
    )
    .unwrap()
});

static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="category"], [class*="tag"]"#).unwrap());

/// Whitespace-collapsed text of `el`.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Like [`text_of`] but `None` when empty.
pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    Some(text_of(el)).filter(|t| !t.is_empty())
}

/// Text of the first descendant matching `sel`, if that text is non-empty.
pub(crate) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().and_then(element_text)
}

/// Text of the first descendant matching `sel` that has any text.
pub(crate) fn first_non_empty_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).find_map(element_text)
}

/// `el` itself or its nearest ancestor matching `sel`.
pub(crate) fn closest<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    if sel.matches(&el) {
        return Some(el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| sel.matches(ancestor))
}

pub(crate) fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Non-empty attribute value.
pub(crate) fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

/// `src` (or lazy-loaded `data-src`) of the first image under `scope`, resolved.
pub(crate) fn image_url(
    scope: ElementRef<'_>,
    sel: Option<&Selector>,
    base: &str,
) -> Option<String> {
    let img = scope.select(sel.unwrap_or(&*IMAGE)).next()?;
    let src = attr(img, "src").or_else(|| attr(img, "data-src"))?;
    resolve_url(Some(src), base)
}

/// Date from a `<time>` element (its `datetime`, then its text), else from
/// the text of the first `fallback` match.
pub(crate) fn date_from(
    scope: ElementRef<'_>,
    time: &Selector,
    fallback: Option<&Selector>,
) -> Option<DateTime<Utc>> {
    let from_time = scope.select(time).next().and_then(|t| {
        parse_date(t.value().attr("datetime")).or_else(|| parse_date(Some(&text_of(t))))
    });
    from_time.or_else(|| {
        let el = scope.select(fallback?).next()?;
        parse_date(Some(&text_of(el)))
    })
}

/// Deduplicated category and tag labels under `scope`.
pub(crate) fn categories(scope: ElementRef<'_>) -> Option<Vec<String>> {
    let labels: Vec<String> = scope
        .select(&CATEGORY)
        .filter_map(element_text)
        .unique()
        .collect();
    Some(labels).filter(|l| !l.is_empty())
}

/// Category, tag and filter pages are listings, not articles.
pub(crate) fn is_category_link(href: &str) -> bool {
    CATEGORY_LINK.is_match(href)
}

/// Empty, script and in-page anchor hrefs.
pub(crate) fn is_unusable_href(href: &str) -> bool {
    let href = href.trim();
    href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
}

/// Whether two absolute URLs point at the same page, ignoring a trailing slash.
pub(crate) fn same_page(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Read an article page: description from meta tags or the first paragraph of
/// `main_paragraphs`, reading time from `body` (or all `main_paragraphs`).
pub(crate) fn read_article(
    document: &Html,
    body: &Selector,
    main_paragraphs: &Selector,
) -> Enrichment {
    let root = document.root_element();

    let description = [&*META_DESCRIPTION, &*OG_DESCRIPTION]
        .into_iter()
        .find_map(|sel| {
            root.select(sel)
                .next()
                .and_then(|m| attr(m, "content"))
                .map(collapse_whitespace)
                .filter(|d| !d.is_empty())
        })
        .or_else(|| root.select(main_paragraphs).find_map(element_text))
        .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));

    let body_text = match root.select(body).next() {
        Some(region) => text_of(region),
        None => root.select(main_paragraphs).map(text_of).join(" "),
    };
    let reading_time = (!body_text.trim().is_empty()).then(|| estimate_reading_time(&body_text));

    Enrichment {
        description,
        reading_time,
    }
}
