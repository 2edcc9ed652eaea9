use serde::Deserialize;

/// Main configuration structure for Petrel
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum delay between requests within one crawl session (seconds)
    #[serde(rename = "min-delay", default = "default_min_delay")]
    pub min_delay: f64,

    /// Maximum delay between requests within one crawl session (seconds)
    #[serde(rename = "max-delay", default = "default_max_delay")]
    pub max_delay: f64,

    /// Per-navigation timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum retry attempts for a failed fetch (0 means a single attempt)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of jobs that may run concurrently
    #[serde(rename = "max-concurrent-jobs", default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,

    /// Default maximum listing pages to crawl per job
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

/// SSRF protection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// URL schemes the validator accepts
    #[serde(rename = "allowed-schemes", default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    /// Hostname substrings the validator rejects, in addition to the
    /// built-in localhost/loopback patterns
    #[serde(rename = "blocked-hosts", default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

fn default_min_delay() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    5.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_concurrent_jobs() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    10
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_blocked_hosts() -> Vec<String> {
    vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "0.0.0.0".to_string(),
        "::1".to_string(),
    ]
}

fn default_database_path() -> String {
    "./petrel.db".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            blocked_hosts: default_blocked_hosts(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}
