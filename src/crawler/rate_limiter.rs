//! Request spacing for human-like crawling behavior
//!
//! Each crawl session owns one `RateLimiter`. Every `wait()` call picks a
//! fresh target delay uniformly from `[min_delay, max_delay)` and sleeps
//! just long enough that consecutive fetches are at least that far apart.
//! Limiters are independent; concurrent jobs never rate-limit each other.
//!
//! Elapsed time is measured on the monotonic clock (`tokio::time::Instant`),
//! so system clock adjustments cannot distort the spacing.

use crate::config::CrawlerConfig;
use crate::ConfigError;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a randomized minimum spacing between successive requests
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: f64,
    max_delay: f64,
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    /// Creates a rate limiter with the given delay range in seconds.
    ///
    /// Fails if `min_delay` is negative or `max_delay < min_delay`.
    pub fn new(min_delay: f64, max_delay: f64) -> Result<Self, ConfigError> {
        if min_delay < 0.0 {
            return Err(ConfigError::Validation(
                "min_delay must be non-negative".to_string(),
            ));
        }
        if max_delay < min_delay {
            return Err(ConfigError::Validation(
                "max_delay must be >= min_delay".to_string(),
            ));
        }

        tracing::debug!(min_delay, max_delay, "Rate limiter initialized");

        Ok(Self {
            min_delay,
            max_delay,
            last_request_time: None,
        })
    }

    /// Creates a rate limiter from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_delay, config.max_delay)
    }

    /// Waits the appropriate amount of time before the next request.
    ///
    /// Returns the delay actually applied in seconds: the full target delay
    /// for the first request, `0.0` when enough time has already passed,
    /// and the remaining gap otherwise. `last_request_time` is updated on
    /// every call.
    pub async fn wait(&mut self) -> f64 {
        let target = self.pick_target_delay();
        let now = Instant::now();

        let last = match self.last_request_time {
            Some(last) => last,
            None => {
                tracing::debug!(delay = target, "First request, applying initial delay");
                tokio::time::sleep(Duration::from_secs_f64(target)).await;
                self.last_request_time = Some(Instant::now());
                return target;
            }
        };

        let since_last = now.duration_since(last).as_secs_f64();

        if since_last >= target {
            tracing::debug!(since_last, target, "Sufficient time passed, not waiting");
            self.last_request_time = Some(now);
            return 0.0;
        }

        let remaining = target - since_last;
        tracing::debug!(since_last, remaining, target, "Waiting before next request");
        tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
        self.last_request_time = Some(Instant::now());
        remaining
    }

    /// Clears the last-request timestamp, restoring first-request behavior
    pub fn reset(&mut self) {
        tracing::debug!("Rate limiter reset");
        self.last_request_time = None;
    }

    /// Seconds since the last request, or None before the first one
    pub fn time_since_last_request(&self) -> Option<f64> {
        self.last_request_time
            .map(|last| last.elapsed().as_secs_f64())
    }

    fn pick_target_delay(&self) -> f64 {
        if self.max_delay > self.min_delay {
            rand::thread_rng().gen_range(self.min_delay..self.max_delay)
        } else {
            self.min_delay
        }
    }
}
