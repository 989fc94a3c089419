//! reqwest-backed renderer.
//!
//! Fetches the server-rendered HTML of a page without executing scripts. The
//! HTTP client is built lazily on the first page request and shared by every
//! page until [`Renderer::close`] drops it.

use super::{GotoOptions, Page, RenderError, Renderer};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct HttpRenderer {
    user_agent: String,
    client: Mutex<Option<Client>>,
    open_pages: Arc<AtomicUsize>,
}

impl HttpRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client: Mutex::new(None),
            open_pages: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether the shared client has been started.
    pub fn is_started(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Pages handed out and not yet closed.
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    fn client(&self) -> Result<Client, RenderError> {
        let mut slot = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        info!("Started HTTP renderer");
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl Renderer for HttpRenderer {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage, RenderError> {
        let client = self.client()?;
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(HttpPage {
            client,
            html: None,
            open_pages: Arc::clone(&self.open_pages),
        })
    }

    async fn close(&self) {
        let dropped = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if dropped.is_some() {
            info!("Closed HTTP renderer");
        }
    }
}

#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    html: Option<String>,
    open_pages: Arc<AtomicUsize>,
}

impl Page for HttpPage {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn goto(&mut self, url: &str, options: &GotoOptions) -> Result<(), RenderError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                    timeout: options.timeout,
                }
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify)?;
        debug!(bytes = body.len(), "Fetched page");
        self.html = Some(body);
        Ok(())
    }

    async fn content(&self) -> Result<String, RenderError> {
        Ok(self.html.clone().unwrap_or_default())
    }

    async fn close(self) {
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
    }
}
