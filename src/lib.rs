//! Petrel: a polite blog post crawler
//!
//! This crate crawls blogs from a seed URL: it follows pagination, extracts
//! structured post data (title, author, date, content, images), and can
//! fetch each post's own page for full content. Crawling is safe (SSRF
//! validation before any network I/O), polite (randomized request spacing),
//! and resilient (retries with backoff, partial-failure tolerance).

pub mod config;
pub mod crawler;
pub mod export;
pub mod jobs;
pub mod model;
pub mod render;
pub mod storage;

use thiserror::Error;

/// Main error type for Petrel operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to fetch {url} after {attempts} attempts: {last_error}")]
    Fetch {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// `fetch_page` was called before the rendering session was opened.
    /// This is a programming error, never retried.
    #[error("Rendering session not started. Call start() before fetch_page()")]
    SessionNotStarted,

    #[error("Render error: {0}")]
    Render(#[from] render::RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL validation failures, one variant per rejected rule.
///
/// The messages are user-facing: they name the rule that fired and, where
/// relevant, the pattern that matched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL must be a non-empty string")]
    Empty,

    #[error("URL is too short to be valid")]
    TooShort,

    #[error("URL exceeds maximum length of 2048 characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    Malformed(String),

    #[error("URL must have a valid hostname")]
    MissingHost,

    #[error("Invalid URL scheme: {0}. Only http and https are allowed")]
    Scheme(String),

    #[error("Cannot target localhost or internal IPs (matched: {0})")]
    BlockedHost(String),

    #[error("URL contains blocked pattern: {0}")]
    BlockedPattern(String),

    #[error("URL contains encoded blocked pattern: {0}")]
    EncodedBlockedPattern(String),

    #[error("Cannot target {0}")]
    PrivateRange(&'static str),
}

/// Result type alias for Petrel operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, PageFetcher, RateLimiter, UrlValidator};
pub use model::{CrawlJob, CrawlStats, ExtractedPost, JobStatus};
pub use render::{HttpRenderer, RenderSession, RenderedPage, Renderer};
