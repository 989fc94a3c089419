//! In-memory renderer for tests: serves canned HTML per URL and counts pages.

use super::{GotoOptions, Page, RenderError, Renderer};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    pages: HashMap<String, String>,
    hanging: HashSet<String>,
    failures_left: Mutex<HashMap<String, usize>>,
    visited: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Default)]
pub(crate) struct StubRenderer {
    shared: Arc<Shared>,
    fail_new_page: bool,
}

impl StubRenderer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn shared_mut(&mut self) -> &mut Shared {
        Arc::get_mut(&mut self.shared).expect("configure the stub before use")
    }

    pub(crate) fn with_page(mut self, url: &str, html: &str) -> Self {
        self.shared_mut().pages.insert(url.to_string(), html.to_string());
        self
    }

    pub(crate) fn with_hanging_page(mut self, url: &str) -> Self {
        self.shared_mut().hanging.insert(url.to_string());
        self
    }

    /// The first `times` navigations to `url` fail before it starts serving.
    pub(crate) fn failing_first(mut self, url: &str, times: usize) -> Self {
        self.shared_mut()
            .failures_left
            .get_mut()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    pub(crate) fn failing_new_page(mut self) -> Self {
        self.fail_new_page = true;
        self
    }

    pub(crate) fn pages_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn pages_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn visited(&self) -> Vec<String> {
        self.shared.visited.lock().unwrap().clone()
    }
}

pub(crate) struct StubPage {
    shared: Arc<Shared>,
    html: Option<String>,
}

impl Page for StubPage {
    async fn goto(&mut self, url: &str, _options: &GotoOptions) -> Result<(), RenderError> {
        self.shared.visited.lock().unwrap().push(url.to_string());
        if self.shared.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
        {
            let mut failures = self.shared.failures_left.lock().unwrap();
            if let Some(left) = failures.get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    return Err(RenderError::Navigation {
                        url: url.to_string(),
                        message: "connection reset".to_string(),
                    });
                }
            }
        }
        match self.shared.pages.get(url) {
            Some(html) => {
                self.html = Some(html.clone());
                Ok(())
            }
            None => Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn content(&self) -> Result<String, RenderError> {
        Ok(self.html.clone().unwrap_or_default())
    }

    async fn close(self) {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Renderer for StubRenderer {
    type Page = StubPage;

    async fn new_page(&self) -> Result<StubPage, RenderError> {
        if self.fail_new_page {
            return Err(RenderError::Unavailable("Page creation failed".to_string()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StubPage {
            shared: Arc::clone(&self.shared),
            html: None,
        })
    }

    async fn close(&self) {}
}
