//! Two-phase crawl orchestration
//!
//! Phase 1 walks the listing pagination, collecting teaser posts. Phase 2
//! optionally fetches each discovered post's own page and merges the full
//! content into the teaser. Fetch failures are recorded in [`CrawlStats`]
//! rather than propagated: a phase-1 failure stops pagination but keeps
//! everything collected so far, and a phase-2 failure keeps the teaser.
//! Only URL validation and session setup abort the run.

use crate::config::Config;
use crate::crawler::extractor;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::validator::UrlValidator;
use crate::model::{CrawlStats, ExtractedPost};
use crate::render::Renderer;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Crawls a blog starting at `blog_url`.
///
/// Validates the URL before any network I/O, then runs the listing crawl
/// (up to `max_pages` pages) and, when `fetch_full_content` is set, the
/// enrichment pass over each post's own page. The rendering session is
/// closed on every exit path.
///
/// # Arguments
///
/// * `renderer` - Rendering backend; each run opens its own session
/// * `config` - Crawler settings (delays, timeout, retries) and security policy
/// * `blog_url` - Seed URL of the blog to crawl
/// * `max_pages` - Upper bound on listing pages to walk
/// * `fetch_full_content` - Whether to fetch each post's own page in phase 2
///
/// # Returns
///
/// The extracted posts in discovery order, and the run's statistics. Errors
/// recorded in the stats are informational and do not fail the run.
pub async fn crawl(
    renderer: Arc<dyn Renderer>,
    config: &Config,
    blog_url: &str,
    max_pages: u32,
    fetch_full_content: bool,
) -> crate::Result<(Vec<ExtractedPost>, CrawlStats)> {
    let validator = UrlValidator::new(&config.security);
    let start_url = validator.validate(blog_url)?;

    let mut fetcher = PageFetcher::new(renderer, &config.crawler)?;
    fetcher.start().await?;

    tracing::info!(url = %blog_url, max_pages, fetch_full_content, "Starting crawl");

    // Session must be released whether the crawl succeeds or not
    let result = run_phases(
        &mut fetcher,
        blog_url,
        start_url,
        max_pages,
        fetch_full_content,
    )
    .await;
    fetcher.close().await;

    if let Ok((posts, stats)) = &result {
        tracing::info!(
            url = %blog_url,
            pages = stats.pages_scraped,
            posts = posts.len(),
            errors = stats.errors.len(),
            "Crawl finished"
        );
    }

    result
}

async fn run_phases(
    fetcher: &mut PageFetcher,
    blog_url: &str,
    start_url: Url,
    max_pages: u32,
    fetch_full_content: bool,
) -> crate::Result<(Vec<ExtractedPost>, CrawlStats)> {
    let mut stats = CrawlStats::new();
    let mut posts: Vec<ExtractedPost> = Vec::new();
    let mut enrich_queue: Vec<usize> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();

    // Phase 1: listing crawl
    let mut current = Some(start_url);
    let mut pages_walked = 0u32;
    while let Some(url) = current.take() {
        if pages_walked >= max_pages {
            tracing::info!(limit = max_pages, "Page limit reached");
            break;
        }
        if !visited.insert(url.to_string()) {
            tracing::warn!(url = %url, "Pagination loop detected");
            break;
        }
        pages_walked += 1;

        let html = match fetcher.fetch_page(url.as_str()).await {
            Ok(html) => html,
            Err(err) => {
                tracing::error!(url = %url, error = %err, "Listing fetch failed, stopping pagination");
                stats.record_error(err.to_string());
                break;
            }
        };
        stats.pages_scraped += 1;

        let extracted = extractor::extract_listing(&html, &url);
        tracing::info!(url = %url, posts = extracted.len(), "Scraped listing page");

        for mut post in extracted {
            post.blog_url = blog_url.to_string();
            post.scraped_at = Utc::now();

            let enrich = fetch_full_content && post.post_url.is_some();
            posts.push(post);
            if enrich {
                enrich_queue.push(posts.len() - 1);
            } else {
                stats.posts_found += 1;
            }
        }

        current = extractor::find_next_page_url(&html, &url);
    }

    // Phase 2: full-content enrichment
    if fetch_full_content && !enrich_queue.is_empty() {
        tracing::info!(posts = enrich_queue.len(), "Fetching full post content");

        for idx in enrich_queue {
            let post_url = match posts[idx].post_url.clone() {
                Some(u) => u,
                None => continue,
            };

            if !visited.insert(post_url.clone()) {
                // Already fetched this run, keep the teaser
                stats.posts_found += 1;
                continue;
            }

            match fetcher.fetch_page(&post_url).await {
                Ok(html) => {
                    if let Ok(parsed) = Url::parse(&post_url) {
                        let full = extractor::extract_single_post(&html, &parsed);
                        merge_full_post(&mut posts[idx], full);
                    }
                }
                Err(err) => {
                    // Teaser data beats no data
                    tracing::warn!(url = %post_url, error = %err, "Post fetch failed, keeping teaser");
                    stats.record_error(err.to_string());
                }
            }
            stats.posts_found += 1;
        }
    }

    Ok((posts, stats))
}

/// Merges a full-page extraction into a teaser post. Each field from the
/// full page wins only when non-empty; the excerpt is regenerated from the
/// merged content. The teaser's title and `post_url` are kept.
fn merge_full_post(teaser: &mut ExtractedPost, full: ExtractedPost) {
    if !full.content.is_empty() {
        teaser.excerpt = extractor::generate_excerpt(&full.content);
        teaser.content = full.content;
    }
    if full.author.is_some() {
        teaser.author = full.author;
    }
    if full.published_date.is_some() {
        teaser.published_date = full.published_date;
    }
    if !full.images.is_empty() {
        teaser.images = full.images;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::render::{RenderError, RenderSession, RenderedPage, Renderer};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Serves canned HTML keyed by URL; unknown URLs fail
    struct MapRenderer {
        pages: HashMap<String, String>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    impl MapRenderer {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                fetched: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Renderer for MapRenderer {
        async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
            Ok(Box::new(MapSession {
                pages: self.pages.clone(),
                fetched: Arc::clone(&self.fetched),
            }))
        }
    }

    struct MapSession {
        pages: HashMap<String, String>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RenderSession for MapSession {
        async fn render(
            &mut self,
            url: &str,
            _user_agent: &str,
            _timeout: std::time::Duration,
        ) -> Result<RenderedPage, RenderError> {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(html) => Ok(RenderedPage {
                    status_code: 200,
                    status_text: "OK".to_string(),
                    html: html.clone(),
                }),
                None => Err(RenderError::Failed {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }

        async fn close(&mut self) {}
    }

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.crawler.min_delay = 0.0;
        config.crawler.max_delay = 0.0;
        config.crawler.max_retries = 0;
        config
    }

    #[tokio::test]
    async fn test_two_page_crawl_without_post_urls() {
        let page1 = r#"<html><body>
            <article><h2>Post One</h2><p>Teaser one.</p></article>
            <article><h2>Post Two</h2><p>Teaser two.</p></article>
            <a href="/page2" class="next">Next</a>
        </body></html>"#;
        let page2 = r#"<html><body>
            <article><h2>Post Three</h2><p>Teaser three.</p></article>
            <article><h2>Post Four</h2><p>Teaser four.</p></article>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[
            ("https://example.com/blog", page1),
            ("https://example.com/page2", page2),
        ]));
        let fetched = Arc::clone(&renderer.fetched);

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            true,
        )
        .await
        .unwrap();

        assert_eq!(stats.pages_scraped, 2);
        assert_eq!(posts.len(), 4);
        assert_eq!(stats.posts_found, 4);
        // No post URLs means no enrichment fetches
        assert_eq!(fetched.lock().unwrap().len(), 2);
        assert!(stats.errors.is_empty());
    }

    #[tokio::test]
    async fn test_single_post_pages_fall_back_to_whole_page() {
        // One container per page: each page is treated as a single post with
        // no post URL, so full-content mode has nothing extra to fetch
        let page1 = r#"<html><head><title>Post One</title></head><body>
            <article><h2>Post One</h2><p>Body one.</p></article>
            <a href="/p2" class="next">Next</a>
        </body></html>"#;
        let page2 = r#"<html><head><title>Post Two</title></head><body>
            <article><h2>Post Two</h2><p>Body two.</p></article>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[
            ("https://example.com/blog", page1),
            ("https://example.com/p2", page2),
        ]));
        let fetched = Arc::clone(&renderer.fetched);

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            true,
        )
        .await
        .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(stats.pages_scraped, 2);
        assert_eq!(stats.posts_found, 2);
        assert!(posts.iter().all(|p| p.post_url.is_none()));
        assert_eq!(fetched.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_enrichment_replaces_teaser_content() {
        let listing = r#"<html><body>
            <article><h2><a href="/post-1">Big Story</a></h2><p>Teaser.</p></article>
            <article><h2>Other</h2><p>x</p></article>
        </body></html>"#;
        let post_page = r#"<html><body>
            <h1>Big Story</h1>
            <span class="author">Jane Doe</span>
            <article><p>The complete body of the story.</p></article>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[
            ("https://example.com/blog", listing),
            ("https://example.com/post-1", post_page),
        ]));

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            true,
        )
        .await
        .unwrap();

        let enriched = posts
            .iter()
            .find(|p| p.title == "Big Story")
            .expect("enriched post");
        assert_eq!(enriched.content, "The complete body of the story.");
        assert_eq!(enriched.author.as_deref(), Some("Jane Doe"));
        assert_eq!(
            enriched.excerpt.as_deref(),
            Some("The complete body of the story.")
        );
        assert_eq!(stats.posts_found, 2);
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_teaser() {
        let listing = r#"<html><body>
            <article><h2><a href="/gone">Vanished Post</a></h2><p>The teaser text.</p></article>
            <article><h2>Other</h2><p>x</p></article>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[(
            "https://example.com/blog",
            listing,
        )]));

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            true,
        )
        .await
        .unwrap();

        let kept = posts
            .iter()
            .find(|p| p.title == "Vanished Post")
            .expect("teaser kept");
        assert_eq!(kept.content, "The teaser text.");
        assert_eq!(stats.posts_found, 2);
        assert_eq!(stats.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_first_page_fetch_failure_returns_empty() {
        let renderer = Arc::new(MapRenderer::new(&[]));

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            false,
        )
        .await
        .unwrap();

        assert!(posts.is_empty());
        assert_eq!(stats.pages_scraped, 0);
        assert_eq!(stats.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_mid_crawl_failure_keeps_prior_pages() {
        let page1 = r#"<html><body>
            <article><h2>Kept Post</h2><p>Still here.</p></article>
            <article><h2>Also Kept</h2><p>Me too.</p></article>
            <a href="/page2" class="next">Next</a>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[(
            "https://example.com/blog",
            page1,
        )]));

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            false,
        )
        .await
        .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(stats.pages_scraped, 1);
        assert_eq!(stats.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_loop_guard() {
        // Page links to itself as "next"
        let page = r#"<html><body>
            <article><h2>A</h2><p>x</p></article>
            <article><h2>B</h2><p>y</p></article>
            <a href="/blog" class="next">Next</a>
        </body></html>"#;

        let renderer = Arc::new(MapRenderer::new(&[("https://example.com/blog", page)]));

        let (posts, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            10,
            false,
        )
        .await
        .unwrap();

        assert_eq!(stats.pages_scraped, 1);
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_max_pages_respected() {
        let page = |next: &str| {
            format!(
                r#"<html><body>
                    <article><h2>P</h2><p>x</p></article>
                    <article><h2>Q</h2><p>y</p></article>
                    <a href="{}" class="next">Next</a>
                </body></html>"#,
                next
            )
        };
        let p1 = page("/p2");
        let p2 = page("/p3");
        let p3 = page("/p4");

        let renderer = Arc::new(MapRenderer::new(&[
            ("https://example.com/blog", p1.as_str()),
            ("https://example.com/p2", p2.as_str()),
            ("https://example.com/p3", p3.as_str()),
        ]));

        let (_, stats) = crawl(
            renderer,
            &fast_config(),
            "https://example.com/blog",
            2,
            false,
        )
        .await
        .unwrap();

        assert_eq!(stats.pages_scraped, 2);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_session_opens() {
        struct CountingRenderer(AtomicU32);

        #[async_trait]
        impl Renderer for CountingRenderer {
            async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(RenderError::Failed {
                    url: String::new(),
                    message: "should not be called".to_string(),
                })
            }
        }

        let renderer = Arc::new(CountingRenderer(AtomicU32::new(0)));
        let result = crawl(
            Arc::clone(&renderer) as Arc<dyn Renderer>,
            &fast_config(),
            "http://localhost:8080/admin",
            10,
            false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(renderer.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blocked_host_from_config_rejected() {
        let mut config = fast_config();
        config.security = SecurityConfig {
            blocked_hosts: vec!["internal.corp".to_string()],
            ..SecurityConfig::default()
        };

        let renderer = Arc::new(MapRenderer::new(&[]));
        let result = crawl(
            renderer,
            &config,
            "https://internal.corp/blog",
            10,
            false,
        )
        .await;

        assert!(result.is_err());
    }
}
