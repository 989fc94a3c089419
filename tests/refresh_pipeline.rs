//! End-to-end: refresh a blog source through extraction, enrichment, assembly
//! and both cache tiers, then serve it again from a fresh process.

use pretty_assertions::assert_eq;
use sitefeed::AppConfig;
use sitefeed::enricher::EnrichOptions;
use sitefeed::models::{ExtractorKind, FeedFormat, SourceConfig};
use sitefeed::renderer::{GotoOptions, Page, RenderError, Renderer, RetryPolicy};
use sitefeed::service::{FeedService, FeedSource, RefreshStatus};
use sitefeed::store::ArticleStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

const BLOG: &str = "https://claude.com/blog";

#[derive(Clone, Default)]
struct FixtureRenderer {
    pages: Arc<HashMap<String, String>>,
    navigations: Arc<AtomicUsize>,
}

impl FixtureRenderer {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
            ),
            navigations: Arc::default(),
        }
    }

    fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }
}

struct FixturePage {
    renderer: FixtureRenderer,
    html: String,
}

impl Page for FixturePage {
    async fn goto(&mut self, url: &str, _options: &GotoOptions) -> Result<(), RenderError> {
        self.renderer.navigations.fetch_add(1, Ordering::SeqCst);
        match self.renderer.pages.get(url) {
            Some(html) => {
                self.html = html.clone();
                Ok(())
            }
            None => Err(RenderError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn content(&self) -> Result<String, RenderError> {
        Ok(self.html.clone())
    }

    async fn close(self) {}
}

impl Renderer for FixtureRenderer {
    type Page = FixturePage;

    async fn new_page(&self) -> Result<FixturePage, RenderError> {
        Ok(FixturePage {
            renderer: self.clone(),
            html: String::new(),
        })
    }

    async fn close(&self) {}
}

fn blog_index() -> String {
    r#"<html><head><title>Blog | Claude</title></head><body>
      <div class="blog_cms_item">
        <a href="/blog/agent-skills">Read</a>
        <h3 class="card_blog_title">Equipping agents with Skills</h3>
        <div class="card_blog_list_meta">October 16, 2025</div>
        <div class="card_blog_visual_wrap"><img src="https://cdn.claude.com/skills.png"></div>
      </div>
      <div class="blog_cms_item">
        <a href="/blog/agent-skills">Read</a>
        <h3 class="card_blog_title">Duplicate card for the same post</h3>
      </div>
      <div class="blog_cms_item">
        <a href="/blog/memory-tool">Read</a>
        <h3 class="card_blog_title">Managing context with memory</h3>
      </div>
    </body></html>"#
        .to_string()
}

fn post(summary: &str, words: usize) -> String {
    format!(
        r#"<html><head><meta name="description" content="{summary}"></head><body>
           <div class="u-rich-text-blog"><p>{}</p></div></body></html>"#,
        vec!["token"; words].join(" ")
    )
}

fn config(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        data_dir: dir.to_path_buf(),
        sources: vec![SourceConfig::new(BLOG, ExtractorKind::ClaudeBlog, "claude-blog")],
        ..AppConfig::default()
    }
}

fn service(dir: &std::path::Path, renderer: FixtureRenderer) -> FeedService<FixtureRenderer> {
    FeedService::new(&config(dir), renderer)
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
        .with_enrich_options(EnrichOptions {
            delay: Duration::from_millis(1),
            ..EnrichOptions::default()
        })
}

#[tokio::test]
async fn test_refresh_then_serve_from_disk_in_a_new_process() {
    let dir = tempdir().unwrap();
    let renderer = FixtureRenderer::new(&[
        (BLOG, blog_index()),
        ("https://claude.com/blog/agent-skills", post("Skills package expertise.", 1000)),
        ("https://claude.com/blog/memory-tool", post("Memory across sessions.", 238)),
    ]);
    let svc = service(dir.path(), renderer.clone());

    let outcomes = svc.refresh(None, false).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, RefreshStatus::Success { articles: 2 });
    // index + two article pages
    assert_eq!(renderer.navigations(), 3);

    let rss = svc.get_feed(BLOG, FeedFormat::Rss).await.unwrap();
    assert_eq!(rss.source, FeedSource::Hit);
    assert!(rss.body.contains("<title>Blog | Claude</title>"));
    assert!(rss.body.contains("<description>Skills package expertise.</description>"));
    assert!(rss.body.contains("<cn:readingTime>4</cn:readingTime>"));
    assert!(rss.body.contains("<cn:readingTime>1</cn:readingTime>"));
    assert_eq!(rss.body.matches("<item>").count(), 2);
    assert!(!rss.body.contains("Duplicate card"));

    let store = ArticleStore::new(dir.path());
    assert_eq!(
        store.get_description("https://claude.com/blog/agent-skills").await.as_deref(),
        Some("Skills package expertise.")
    );
    assert!(dir.path().join("feeds").join("claude-blog.json").exists());

    // a new process with nothing reachable still serves the disk entry
    let offline = service(dir.path(), FixtureRenderer::default());
    let json = offline.get_feed(BLOG, FeedFormat::Json).await.unwrap();
    assert_eq!(json.source, FeedSource::Disk);
    let feed: serde_json::Value = serde_json::from_str(&json.body).unwrap();
    assert_eq!(feed["items"][0]["_cn"]["readingTime"], 4);
    assert_eq!(feed["items"][0]["image"], "https://cdn.claude.com/skills.png");
}

#[tokio::test]
async fn test_second_refresh_uses_cached_descriptions() {
    let dir = tempdir().unwrap();
    let renderer = FixtureRenderer::new(&[
        (BLOG, blog_index()),
        ("https://claude.com/blog/agent-skills", post("Skills package expertise.", 500)),
        ("https://claude.com/blog/memory-tool", post("Memory across sessions.", 500)),
    ]);
    let svc = service(dir.path(), renderer.clone());

    svc.refresh(Some(BLOG), false).await.unwrap();
    assert_eq!(renderer.navigations(), 3);

    svc.refresh(Some(BLOG), false).await.unwrap();
    // only the index is fetched again
    assert_eq!(renderer.navigations(), 4);

    svc.refresh(Some(BLOG), true).await.unwrap();
    // cached descriptions still count as hits after a forced refresh
    assert_eq!(renderer.navigations(), 5);
    let rss = svc.get_feed(BLOG, FeedFormat::Rss).await.unwrap();
    assert!(!rss.body.contains("cn:readingTime"));
}
