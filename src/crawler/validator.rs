//! URL validation for SSRF prevention
//!
//! Every crawl target passes through here before any network I/O happens.
//! The checks run in a fixed order and fail fast on the first violation:
//! length, parseability, scheme, blocked host literals, blocked URL
//! patterns, a percent-decoded re-check, and private IPv4 ranges.

use crate::config::SecurityConfig;
use crate::ValidationError;
use percent_encoding::percent_decode_str;
use url::Url;

/// Hostname substrings that always denote loopback/internal targets,
/// checked in addition to the configured blocked hosts. "127." catches
/// 127.0.0.1, 127.1, and friends.
const BLOCKED_HOST_LITERALS: &[&str] = &[
    "localhost",
    "127.",
    "0.0.0.0",
    "::1",
    "0:0:0:0:0:0:0:1",
    "[::]",
];

/// Dangerous scheme/protocol fragments rejected anywhere in the URL
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "file://",
    "javascript:",
    "data:",
    "ftp://",
    "vbscript:",
    "about:",
];

/// Validates crawl target URLs against SSRF attacks
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: Vec<String>,
    blocked_hosts: Vec<String>,
}

impl UrlValidator {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            allowed_schemes: config
                .allowed_schemes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            blocked_hosts: config
                .blocked_hosts
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Validates a URL, returning the parsed form on success or the
    /// specific rule violated on failure.
    ///
    /// # Example
    ///
    /// ```
    /// use petrel::config::SecurityConfig;
    /// use petrel::crawler::UrlValidator;
    ///
    /// let validator = UrlValidator::new(&SecurityConfig::default());
    /// assert!(validator.validate("https://example.com/blog").is_ok());
    /// assert!(validator.validate("http://localhost/admin").is_err());
    /// ```
    pub fn validate(&self, url: &str) -> Result<Url, ValidationError> {
        let url = url.trim();

        if url.is_empty() {
            return Err(ValidationError::Empty);
        }
        if url.len() < 10 {
            return Err(ValidationError::TooShort);
        }
        if url.len() > 2048 {
            return Err(ValidationError::TooLong);
        }

        let parsed = Url::parse(url).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_lowercase(),
            _ => return Err(ValidationError::MissingHost),
        };

        let scheme = parsed.scheme().to_lowercase();
        if !self.allowed_schemes.iter().any(|s| s == &scheme) {
            tracing::warn!(url, scheme, "Blocked URL with invalid scheme");
            return Err(ValidationError::Scheme(scheme));
        }

        let url_lower = url.to_lowercase();

        for blocked in self.blocked_host_iter() {
            if host.contains(blocked) {
                tracing::warn!(url, host, pattern = blocked, "Blocked internal host");
                return Err(ValidationError::BlockedHost(blocked.to_string()));
            }
        }

        for pattern in BLOCKED_URL_PATTERNS {
            if url_lower.contains(pattern) {
                tracing::warn!(url, pattern, "Blocked URL pattern");
                return Err(ValidationError::BlockedPattern(pattern.to_string()));
            }
        }

        // Decode once and re-check, to catch percent-encoded localhost tricks
        // like %6c%6f%63%61%6c%68%6f%73%74.
        if let Ok(decoded) = percent_decode_str(&url_lower).decode_utf8() {
            if decoded != url_lower {
                for blocked in self.blocked_host_iter() {
                    if decoded.contains(blocked) {
                        tracing::warn!(url, pattern = blocked, "Blocked encoded internal host");
                        return Err(ValidationError::EncodedBlockedPattern(blocked.to_string()));
                    }
                }
                for pattern in BLOCKED_URL_PATTERNS {
                    if decoded.contains(pattern) {
                        tracing::warn!(url, pattern, "Blocked encoded URL pattern");
                        return Err(ValidationError::EncodedBlockedPattern(pattern.to_string()));
                    }
                }
            }
        }

        check_private_ipv4(&host)?;

        tracing::debug!(url, host, "URL validation passed");
        Ok(parsed)
    }

    /// Boolean convenience form of [`validate`](Self::validate)
    pub fn is_valid(&self, url: &str) -> bool {
        self.validate(url).is_ok()
    }

    fn blocked_host_iter(&self) -> impl Iterator<Item = &str> {
        BLOCKED_HOST_LITERALS
            .iter()
            .copied()
            .chain(self.blocked_hosts.iter().map(String::as_str))
    }
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(&SecurityConfig::default())
    }
}

/// Rejects dotted-quad hosts in private, link-local, or loopback ranges.
/// Hostnames that are not plain IPv4 literals pass through untouched.
fn check_private_ipv4(host: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 4 {
        return Ok(());
    }

    let mut octets = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        match part.parse::<u8>() {
            Ok(n) => octets[i] = n,
            Err(_) => return Ok(()),
        }
    }

    match octets {
        [10, ..] => Err(ValidationError::PrivateRange(
            "private IP range (10.0.0.0/8)",
        )),
        [172, b, ..] if (16..=31).contains(&b) => Err(ValidationError::PrivateRange(
            "private IP range (172.16.0.0/12)",
        )),
        [192, 168, ..] => Err(ValidationError::PrivateRange(
            "private IP range (192.168.0.0/16)",
        )),
        [169, 254, ..] => Err(ValidationError::PrivateRange(
            "link-local IP range (169.254.0.0/16)",
        )),
        [127, ..] => Err(ValidationError::PrivateRange(
            "localhost IP range (127.0.0.0/8)",
        )),
        _ => Ok(()),
    }
}
