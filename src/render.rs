//! Browser rendering capability
//!
//! The crawler treats page rendering as a black box: open a session, ask it
//! to render a URL into final HTML, close it. The `Renderer`/`RenderSession`
//! traits are that boundary; `HttpRenderer` is the default implementation,
//! backed by a plain HTTP client. A JavaScript-executing renderer would slot
//! in behind the same traits.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering session
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render timeout for {url}")]
    Timeout { url: String },

    #[error("Render failed for {url}: {message}")]
    Failed { url: String, message: String },
}

impl RenderError {
    /// Returns true for timeout-kind errors
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The outcome of rendering one URL
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// HTTP status code of the navigation response
    pub status_code: u16,

    /// Human-readable status text (e.g. "Not Found")
    pub status_text: String,

    /// The fully rendered HTML
    pub html: String,
}

/// Opens rendering sessions
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a new rendering session. The caller owns the session and must
    /// close it when done.
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// One rendering session, exclusively owned by a single page fetcher
#[async_trait]
pub trait RenderSession: Send {
    /// Renders `url` with the given user agent, waiting up to `timeout`
    /// for the page to settle.
    async fn render(
        &mut self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, RenderError>;

    /// Releases the session's resources
    async fn close(&mut self);
}

/// Default renderer backed by a reqwest HTTP client
#[derive(Debug, Clone, Default)]
pub struct HttpRenderer;

impl HttpRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| RenderError::Failed {
                url: String::new(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Box::new(HttpRenderSession { client }))
    }
}

struct HttpRenderSession {
    client: Client,
}

#[async_trait]
impl RenderSession for HttpRenderSession {
    async fn render(
        &mut self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    RenderError::Failed {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RenderError::Failed {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(RenderedPage {
            status_code: status.as_u16(),
            status_text,
            html,
        })
    }

    async fn close(&mut self) {
        // Nothing to release for a plain HTTP client; connections are
        // returned to the pool when the client drops.
    }
}
