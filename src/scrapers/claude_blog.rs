//! Claude blog (`https://claude.com/blog`), a Webflow CMS site.

use super::ArticleCollector;
use super::dom::{
    categories, date_from, first_non_empty_text, first_text, image_url, is_category_link,
    is_unusable_href, parent_element, read_article, same_page, text_of,
};
use crate::models::{Article, Enrichment};
use crate::utils::{parse_date, resolve_url};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const BASE_URL: &str = "https://claude.com";
const INDEX_URL: &str = "https://claude.com/blog";
const MIN_CARD_TITLE_CHARS: usize = 5;
const MIN_LINK_TITLE_CHARS: usize = 10;

static CMS_ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".blog_cms_item, .w-dyn-item").unwrap());
static BLOG_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href*="/blog/"]"#).unwrap());
static CARD_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".card_blog_title").unwrap());
static HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h2, h3, h4, [class*="title"]"#).unwrap());
static META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".card_blog_list_meta, [class*="meta"], [class*="date"]"#).unwrap()
});
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="description"], [class*="excerpt"], [class*="summary"], p"#).unwrap()
});
static CARD_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".card_blog_visual_wrap img, img").unwrap());
static LINK_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="description"], [class*="excerpt"], p"#).unwrap());

static POST_BODY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".u-rich-text-blog, [class*="rich-text"], [class*="blog_post_content"]"#)
        .unwrap()
});
static MAIN_PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article p, main p").unwrap());

pub fn extract(document: &Html, _url: &str) -> Vec<Article> {
    let mut collector = ArticleCollector::new();

    for item in document.select(&CMS_ITEM) {
        if collector.is_full() {
            break;
        }
        if let Some(article) = read_item(item) {
            collector.push(article);
        }
    }

    if collector.is_empty() {
        debug!("No CMS items, scanning /blog/ links");
        for link in document.select(&BLOG_LINK) {
            if collector.is_full() {
                break;
            }
            let Some(full_url) = post_url(link) else {
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
            article.description = parent_element(link)
                .and_then(|parent| first_non_empty_text(parent, &LINK_DESCRIPTION))
                .unwrap_or_default();
            collector.push(article);
        }
    }

    collector.into_articles()
}

/// Absolute URL of a post link; listing, category and anchor links are `None`.
fn post_url(link: ElementRef<'_>) -> Option<String> {
    let href = link.value().attr("href")?;
    if is_unusable_href(href) || is_category_link(href) {
        return None;
    }
    let full_url = resolve_url(Some(href), BASE_URL)?;
    (!same_page(&full_url, INDEX_URL)).then_some(full_url)
}

fn read_item(item: ElementRef<'_>) -> Option<Article> {
    let link = item.select(&BLOG_LINK).next()?;
    let full_url = post_url(link)?;

    let title = first_text(item, &CARD_TITLE)
        .or_else(|| first_text(item, &HEADING))
        .unwrap_or_else(|| text_of(link));
    if title.chars().count() < MIN_CARD_TITLE_CHARS {
        return None;
    }

    let mut article = Article::new(title, full_url);
    article.pub_date = item.select(&META).next().and_then(|meta| {
        date_from(meta, &TIME, None).or_else(|| parse_date(Some(&text_of(meta))))
    });
    article.description = first_non_empty_text(item, &DESCRIPTION).unwrap_or_default();
    article.image_url = image_url(item, Some(&CARD_IMAGE), BASE_URL);
    article.categories = categories(item);
    Some(article)
}

/// Description and reading time from a rendered blog post.
pub fn enrich_article(document: &Html, _url: &str) -> Enrichment {
    read_article(document, &POST_BODY, &MAIN_PARAGRAPHS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use pretty_assertions::assert_eq;

    const PAGE_URL: &str = "https://claude.com/blog";

    const SAMPLE_HTML: &str = r#"
<html><body>
  <div class="blog_cms_grid">
    <div class="blog_cms_item w-dyn-item">
      <div class="card_blog_wrap">
        <a href="/blog/cowork-research-preview" class="clickable_link">Read more</a>
        <div class="card_blog_list_content">
          <h3 class="card_blog_title">Cowork: Claude Code for the rest of your work</h3>
          <div class="card_blog_list_meta">January 12, 2026</div>
        </div>
        <div class="card_blog_visual_wrap">
          <img src="https://cdn.claude.com/images/cowork.jpg" />
        </div>
      </div>
    </div>
    <div class="blog_cms_item w-dyn-item">
      <div class="card_blog_wrap">
        <a href="/blog/enterprise-agents-2026" class="clickable_link">Read more</a>
        <div class="card_blog_list_content">
          <h3 class="card_blog_title">How enterprises are building AI agents in 2026</h3>
          <div class="card_blog_list_meta">December 9, 2025</div>
        </div>
      </div>
    </div>
    <div class="blog_cms_item w-dyn-item">
      <div class="card_blog_wrap">
        <a href="/blog/frontend-design-skills" class="clickable_link">Read more</a>
        <div class="card_blog_list_content">
          <h3 class="card_blog_title">Improving frontend design through Skills</h3>
          <div class="card_blog_list_meta">November 12, 2025</div>
          <p class="description">A deep dive into how Skills improve design workflows.</p>
        </div>
      </div>
    </div>
  </div>
  <nav>
    <a href="/blog">All Posts</a>
  </nav>
</body></html>
"#;

    fn run(html: &str) -> Vec<Article> {
        extract(&Html::parse_document(html), PAGE_URL)
    }

    #[test]
    fn test_extracts_cms_items() {
        let articles = run(SAMPLE_HTML);
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title, "Cowork: Claude Code for the rest of your work");
        assert_eq!(first.link, "https://claude.com/blog/cowork-research-preview");
        assert_eq!(first.guid, first.link);
        assert_eq!(first.pub_date.unwrap().month(), 1);
        assert!(first.image_url.as_deref().unwrap().contains("cowork.jpg"));

        assert_eq!(articles[1].image_url, None);
        assert_eq!(articles[1].description, "");
        assert!(articles[2].description.contains("Skills improve design"));
    }

    #[test]
    fn test_meta_time_element() {
        let html = r#"
          <div class="blog_cms_item">
            <a href="/blog/with-time">Read</a>
            <h3 class="card_blog_title">Post with a time tag</h3>
            <div class="card_blog_list_meta">Product <time datetime="2025-11-04">Nov 4</time></div>
          </div>"#;
        assert_eq!(run(html)[0].pub_date.unwrap().day(), 4);
    }

    #[test]
    fn test_falls_back_to_link_scanning() {
        let html = r#"
          <html><body>
            <div>
              <a href="/blog/some-long-article-post">
                Some Long Article Post Title Here
              </a>
              <p>What the post is about.</p>
            </div>
          </body></html>"#;
        let articles = run(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://claude.com/blog/some-long-article-post");
        assert_eq!(articles[0].title, "Some Long Article Post Title Here");
        assert_eq!(articles[0].description, "What the post is about.");
    }

    #[test]
    fn test_skips_category_filter_links() {
        let html = r#"
          <div class="blog_cms_item">
            <a href="/blog/category/agents" class="clickable_link">Read</a>
            <h3 class="card_blog_title">Agents</h3>
          </div>
          <div class="blog_cms_item">
            <a href="/blog/category/claude-code" class="clickable_link">Read</a>
            <h3 class="card_blog_title">Claude Code</h3>
          </div>
          <div class="blog_cms_item">
            <a href="/blog/real-post-title" class="clickable_link">Read</a>
            <h3 class="card_blog_title">A Real Blog Post Title</h3>
          </div>"#;
        let articles = run(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "A Real Blog Post Title");
    }

    #[test]
    fn test_fallback_skips_index_link() {
        let html = r#"
          <a href="/blog">All Posts</a>
          <a href="/blog/">All Posts, Again, Slashed</a>
          <a href="/blog/real-article-title">A Real Blog Article Title</a>"#;
        let articles = run(html);
        assert_eq!(articles.len(), 1);
        assert!(articles[0].link.contains("real-article-title"));
    }

    #[test]
    fn test_deduplicates_by_url() {
        let item = r#"<div class="blog_cms_item"><a href="/blog/same-post">Read</a>
            <h3 class="card_blog_title">Same Post Title</h3></div>"#;
        assert_eq!(run(&format!("{item}{item}")).len(), 1);
    }

    #[test]
    fn test_caps_at_twenty() {
        let html: String = (0..25)
            .map(|i| {
                format!(
                    r#"<div class="blog_cms_item"><a href="/blog/post-{i}">Read</a>
                       <h3 class="card_blog_title">Blog Post Number {i} Title</h3></div>"#
                )
            })
            .collect();
        assert_eq!(run(&html).len(), 20);
    }

    #[test]
    fn test_no_blog_links() {
        assert!(run("<html><body><p>Nothing</p></body></html>").is_empty());
    }

    #[test]
    fn test_enrich_rich_text_body() {
        let words = vec!["word"; 714].join(" ");
        let html = format!(
            r#"<html><head><meta name="description" content="Post summary."></head>
               <body><div class="u-rich-text-blog w-richtext"><p>{words}</p></div></body></html>"#
        );
        let result = enrich_article(&Html::parse_document(&html), "https://claude.com/blog/x");
        assert_eq!(result.description.as_deref(), Some("Post summary."));
        assert_eq!(result.reading_time, Some(3));
    }
}
