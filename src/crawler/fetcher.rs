//! Page fetcher
//!
//! Owns one rendering session for its lifetime. `start()` opens the session
//! and `close()` releases it; the orchestrator guarantees `close()` runs on
//! every exit path. Each fetch applies rate limiting, rotates through a
//! fixed user-agent list, and retries failures with exponential backoff
//! (1s, 2s, 4s, ...).

use crate::config::CrawlerConfig;
use crate::crawler::rate_limiter::RateLimiter;
use crate::render::{RenderSession, Renderer};
use crate::{ConfigError, CrawlError};
use std::sync::Arc;
use std::time::Duration;

/// User agents rotated round-robin across fetch attempts
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Fetches rendered HTML with rate limiting, retries, and UA rotation
pub struct PageFetcher {
    renderer: Arc<dyn Renderer>,
    session: Option<Box<dyn RenderSession>>,
    rate_limiter: RateLimiter,
    max_retries: u32,
    timeout: Duration,
    user_agent_index: usize,
}

impl PageFetcher {
    /// Creates a fetcher with its own rate limiter. No session is opened
    /// until [`start`](Self::start) is called.
    pub fn new(renderer: Arc<dyn Renderer>, config: &CrawlerConfig) -> Result<Self, ConfigError> {
        let rate_limiter = RateLimiter::from_config(config)?;

        Ok(Self {
            renderer,
            session: None,
            rate_limiter,
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.request_timeout),
            user_agent_index: 0,
        })
    }

    /// Opens the rendering session. Calling this twice is harmless.
    pub async fn start(&mut self) -> crate::Result<()> {
        if self.session.is_some() {
            tracing::warn!("Rendering session already started");
            return Ok(());
        }

        tracing::debug!("Opening rendering session");
        self.session = Some(self.renderer.open().await?);
        Ok(())
    }

    /// Releases the rendering session. Safe to call when already closed.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            tracing::debug!("Rendering session closed");
        }
    }

    /// Fetches the rendered HTML for `url` using the configured retry
    /// count and timeout.
    pub async fn fetch_page(&mut self, url: &str) -> crate::Result<String> {
        self.fetch_page_with(url, self.max_retries, self.timeout)
            .await
    }

    /// Fetches the rendered HTML for `url`.
    ///
    /// Makes up to `max_retries + 1` attempts. Each attempt waits on the
    /// rate limiter, advances the user-agent rotation, and renders the page
    /// with the given timeout. A response status >= 400 counts as a
    /// failure. Attempts after a failure back off `2^attempt` seconds.
    ///
    /// # Errors
    ///
    /// * [`CrawlError::SessionNotStarted`] if `start()` was never called;
    ///   a programming error, reported immediately without retrying
    /// * [`CrawlError::Fetch`] when every attempt failed, embedding the
    ///   URL, attempt count, and last underlying error
    pub async fn fetch_page_with(
        &mut self,
        url: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> crate::Result<String> {
        if self.session.is_none() {
            return Err(CrawlError::SessionNotStarted);
        }

        let attempts = max_retries + 1;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            self.rate_limiter.wait().await;

            let user_agent = self.next_user_agent();

            tracing::info!(url, attempt = attempt + 1, attempts, "Fetching page");

            let session = self.session.as_mut().ok_or(CrawlError::SessionNotStarted)?;

            match session.render(url, user_agent, timeout).await {
                Ok(page) if page.status_code >= 400 => {
                    last_error = format!("HTTP {}: {}", page.status_code, page.status_text);
                    tracing::warn!(url, attempt = attempt + 1, error = %last_error, "Fetch failed");
                }
                Ok(page) => {
                    tracing::info!(
                        url,
                        html_length = page.html.len(),
                        status = page.status_code,
                        "Page fetched successfully"
                    );
                    return Ok(page.html);
                }
                Err(e) => {
                    if e.is_timeout() {
                        tracing::warn!(url, attempt = attempt + 1, "Fetch timeout");
                    } else {
                        tracing::warn!(url, attempt = attempt + 1, error = %e, "Fetch error");
                    }
                    last_error = e.to_string();
                }
            }

            if attempt < max_retries {
                let backoff = Duration::from_secs(1 << attempt);
                tracing::info!(url, backoff_secs = backoff.as_secs(), "Retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
        }

        tracing::error!(url, error = %last_error, "Fetch failed after all retries");
        Err(CrawlError::Fetch {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }

    /// Resets the fetcher's rate limiter (fresh-session behavior)
    pub fn reset_rate_limiter(&mut self) {
        self.rate_limiter.reset();
    }

    fn next_user_agent(&mut self) -> &'static str {
        let user_agent = USER_AGENTS[self.user_agent_index];
        self.user_agent_index = (self.user_agent_index + 1) % USER_AGENTS.len();
        user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderError, RenderedPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Renderer whose sessions fail a scripted number of times before
    /// succeeding, recording every user agent they were given.
    struct ScriptedRenderer {
        fail_times: u32,
        status: u16,
        calls: Arc<AtomicU32>,
        user_agents: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedRenderer {
        fn new(fail_times: u32) -> Self {
            Self {
                fail_times,
                status: 200,
                calls: Arc::new(AtomicU32::new(0)),
                user_agents: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_status(status: u16) -> Self {
            let mut r = Self::new(0);
            r.status = status;
            r
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
            Ok(Box::new(ScriptedSession {
                fail_times: self.fail_times,
                status: self.status,
                calls: self.calls.clone(),
                user_agents: self.user_agents.clone(),
            }))
        }
    }

    struct ScriptedSession {
        fail_times: u32,
        status: u16,
        calls: Arc<AtomicU32>,
        user_agents: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RenderSession for ScriptedSession {
        async fn render(
            &mut self,
            url: &str,
            user_agent: &str,
            _timeout: Duration,
        ) -> Result<RenderedPage, RenderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.user_agents
                .lock()
                .unwrap()
                .push(user_agent.to_string());

            if call < self.fail_times {
                return Err(RenderError::Failed {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }

            Ok(RenderedPage {
                status_code: self.status,
                status_text: if self.status == 404 {
                    "Not Found".to_string()
                } else {
                    "OK".to_string()
                },
                html: "<html><body>ok</body></html>".to_string(),
            })
        }

        async fn close(&mut self) {}
    }

    fn fast_config() -> CrawlerConfig {
        CrawlerConfig {
            min_delay: 0.0,
            max_delay: 0.0,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let renderer = Arc::new(ScriptedRenderer::new(2));
        let calls = renderer.calls.clone();
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();
        fetcher.start().await.unwrap();

        let html = fetcher
            .fetch_page_with("https://example.com/blog", 2, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(html.contains("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_fail() {
        let renderer = Arc::new(ScriptedRenderer::new(u32::MAX));
        let calls = renderer.calls.clone();
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();
        fetcher.start().await.unwrap();

        let err = fetcher
            .fetch_page_with("https://example.com/blog", 2, Duration::from_secs(30))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let message = err.to_string();
        assert!(
            message.contains("3"),
            "message should name the attempt count: {}",
            message
        );
        assert!(message.contains("https://example.com/blog"));
    }

    #[tokio::test]
    async fn test_fetch_before_start_is_fatal() {
        let renderer = Arc::new(ScriptedRenderer::new(0));
        let calls = renderer.calls.clone();
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();

        let err = fetcher.fetch_page("https://example.com/blog").await;
        assert!(matches!(err, Err(CrawlError::SessionNotStarted)));
        // Never reached the renderer
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_status_is_a_failure() {
        let renderer = Arc::new(ScriptedRenderer::with_status(404));
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();
        fetcher.start().await.unwrap();

        let err = fetcher
            .fetch_page_with("https://example.com/gone", 0, Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_agent_rotation_wraps() {
        let renderer = Arc::new(ScriptedRenderer::new(u32::MAX));
        let agents = renderer.user_agents.clone();
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();
        fetcher.start().await.unwrap();

        // 6 attempts over a 5-entry rotation: the sixth reuses the first
        let _ = fetcher
            .fetch_page_with("https://example.com/", 5, Duration::from_secs(30))
            .await;

        let seen = agents.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], USER_AGENTS[0]);
        assert_eq!(seen[4], USER_AGENTS[4]);
        assert_eq!(seen[5], USER_AGENTS[0]);
    }

    #[tokio::test]
    async fn test_close_without_start_is_harmless() {
        let renderer = Arc::new(ScriptedRenderer::new(0));
        let mut fetcher = PageFetcher::new(renderer, &fast_config()).unwrap();
        fetcher.close().await;
    }
}
