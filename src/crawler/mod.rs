//! Crawl engine
//!
//! The pieces that turn a seed URL into structured posts: URL safety
//! validation, randomized request spacing, a retrying page fetcher over a
//! rendering session, heuristic content extraction, and the two-phase
//! orchestrator that drives them.

pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod rate_limiter;
pub mod validator;

pub use extractor::{extract_listing, extract_single_post, find_next_page_url, generate_excerpt};
pub use fetcher::{PageFetcher, USER_AGENTS};
pub use orchestrator::crawl;
pub use rate_limiter::RateLimiter;
pub use validator::UrlValidator;
