//! Page rendering seam.
//!
//! Source and article pages are produced by a rendering engine that is treated
//! as a black box: open a page, navigate it, read back the final HTML, close it.
//! The engine itself is a single shared, lazily initialized resource; every
//! logical fetch gets its own [`Page`] and closes it on every exit path.
//!
//! # Implementations
//!
//! | Type | Module | Notes |
//! |------|--------|-------|
//! | [`HttpRenderer`] | [`http`] | Plain HTTP fetch via reqwest, no script execution |
//!
//! [`render_page`] is the only entry point the pipeline uses. It bounds the
//! navigation with [`GotoOptions::timeout`] and guarantees the page is closed.
//! [`retry::render_with_retry`] layers exponential backoff on top for source
//! pages.

pub mod http;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpRenderer;
pub use retry::{RetryPolicy, render_with_retry};

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Timed out after {timeout:?} loading {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// When navigation is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    #[default]
    NetworkIdle,
}

#[derive(Debug, Clone)]
pub struct GotoOptions {
    /// Upper bound for navigation plus render.
    pub timeout: Duration,
    pub wait_until: WaitUntil,
    /// Extra settle time after navigation, honoured by engines that run scripts.
    pub settle: Duration,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            wait_until: WaitUntil::NetworkIdle,
            settle: Duration::from_millis(1000),
        }
    }
}

/// One browser tab.
pub trait Page {
    async fn goto(&mut self, url: &str, options: &GotoOptions) -> Result<(), RenderError>;

    /// Final HTML of the current document.
    async fn content(&self) -> Result<String, RenderError>;

    async fn close(self);
}

/// A shared rendering engine handing out pages.
pub trait Renderer {
    type Page: Page;

    async fn new_page(&self) -> Result<Self::Page, RenderError>;

    /// Release the engine. A later [`Renderer::new_page`] starts it again.
    async fn close(&self);
}

/// Render `url` on a fresh page and return its HTML.
///
/// Navigation is bounded by `options.timeout`; the page is closed whether
/// navigation succeeds, fails or times out.
#[instrument(level = "debug", skip_all, fields(%url))]
pub async fn render_page<R: Renderer>(
    renderer: &R,
    url: &str,
    options: &GotoOptions,
) -> Result<String, RenderError> {
    let mut page = renderer.new_page().await?;
    let result = load(&mut page, url, options).await;
    page.close().await;
    if let Ok(html) = &result {
        debug!(bytes = html.len(), "Rendered page");
    }
    result
}

async fn load<P: Page>(
    page: &mut P,
    url: &str,
    options: &GotoOptions,
) -> Result<String, RenderError> {
    match timeout(options.timeout, page.goto(url, options)).await {
        Ok(navigated) => navigated?,
        Err(_) => {
            return Err(RenderError::Timeout {
                url: url.to_string(),
                timeout: options.timeout,
            });
        }
    }
    page.content().await
}

#[cfg(test)]
mod tests {
    use super::testing::StubRenderer;
    use super::*;

    #[tokio::test]
    async fn test_render_page_returns_html_and_closes_page() {
        let renderer = StubRenderer::new().with_page("https://a.example", "<html>ok</html>");
        let html = render_page(&renderer, "https://a.example", &GotoOptions::default())
            .await
            .unwrap();
        assert_eq!(html, "<html>ok</html>");
        assert_eq!(renderer.pages_opened(), 1);
        assert_eq!(renderer.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_render_page_closes_page_on_navigation_error() {
        let renderer = StubRenderer::new();
        let err = render_page(&renderer, "https://missing.example", &GotoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(renderer.pages_opened(), 1);
        assert_eq!(renderer.pages_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_page_times_out_and_closes_page() {
        let renderer = StubRenderer::new().with_hanging_page("https://slow.example");
        let options = GotoOptions {
            timeout: Duration::from_secs(30),
            ..GotoOptions::default()
        };
        let err = render_page(&renderer, "https://slow.example", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert_eq!(renderer.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_render_page_propagates_new_page_failure() {
        let renderer = StubRenderer::new().failing_new_page();
        let err = render_page(&renderer, "https://a.example", &GotoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Unavailable(_)));
        assert_eq!(renderer.pages_opened(), 0);
    }
}
