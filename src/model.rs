//! Core data model: extracted posts, crawl statistics, and job records
//!
//! `ExtractedPost` and `CrawlStats` are transient values owned by one
//! orchestrator run. `CrawlJob` is the persisted record of a run and its
//! status state machine: Pending -> InProgress -> {Completed, Failed},
//! forward transitions only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if `to` is a legal forward transition from this status
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        match (self, to) {
            (Self::Pending, Self::InProgress) => true,
            (Self::InProgress, Self::Completed) => true,
            (Self::InProgress, Self::Failed) => true,
            (Self::Pending, Self::Failed) => true,
            _ => false,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A persisted crawl job
///
/// `pages_scraped` and `posts_found` are written once, at finalization,
/// from the orchestrator's stats; they are never updated mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    pub id: Uuid,
    pub seed_url: String,
    pub status: JobStatus,
    pub pages_scraped: u32,
    pub posts_found: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CrawlJob {
    /// Creates a new pending job for the given seed URL
    pub fn new(seed_url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed_url: seed_url.to_string(),
            status: JobStatus::Pending,
            pages_scraped: 0,
            posts_found: 0,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Marks the job as in progress. Ignored unless the job is pending.
    pub fn mark_in_progress(&mut self) {
        if self.status.can_transition_to(JobStatus::InProgress) {
            self.status = JobStatus::InProgress;
        } else {
            tracing::warn!(
                job_id = %self.id,
                status = %self.status,
                "Refusing illegal transition to in_progress"
            );
        }
    }

    /// Marks the job as completed and stamps `completed_at`.
    pub fn mark_completed(&mut self) {
        if self.status.can_transition_to(JobStatus::Completed) {
            self.status = JobStatus::Completed;
            self.completed_at = Some(Utc::now());
        } else {
            tracing::warn!(
                job_id = %self.id,
                status = %self.status,
                "Refusing illegal transition to completed"
            );
        }
    }

    /// Marks the job as failed with an error message and stamps `completed_at`.
    pub fn mark_failed(&mut self, error_message: &str) {
        if self.status.can_transition_to(JobStatus::Failed) {
            self.status = JobStatus::Failed;
            self.error_message = Some(error_message.to_string());
            self.completed_at = Some(Utc::now());
        } else {
            tracing::warn!(
                job_id = %self.id,
                status = %self.status,
                "Refusing illegal transition to failed"
            );
        }
    }
}

/// A blog post extracted from a listing page or an individual post page
///
/// `blog_url` and `scraped_at` are stamped by the orchestrator, not the
/// extractor. `content` may be teaser-length until phase 2 enriches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPost {
    /// The blog this post was crawled from
    pub blog_url: String,

    /// Absolute URL of the individual post, when discoverable from a listing
    pub post_url: Option<String>,

    /// Post title, never empty (falls back to "Untitled")
    pub title: String,

    pub author: Option<String>,

    /// Publication date from structured markup only; no date guessing
    pub published_date: Option<DateTime<Utc>>,

    /// Extracted body text
    pub content: String,

    /// Derived from `content`; equal to it when content fits in 200 chars
    pub excerpt: Option<String>,

    /// Image URLs in document order, resolved to absolute form
    pub images: Vec<String>,

    pub scraped_at: DateTime<Utc>,
}

/// Statistics accumulated over one orchestrator run
///
/// `errors` is informational and append-only; recording an error never
/// aborts the run by itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub pages_scraped: u32,
    pub posts_found: u32,
    pub errors: Vec<String>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self, message: String) {
        tracing::warn!(error = %message, "Crawl error recorded");
        self.errors.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in &[
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(JobStatus::from_db_string(db_str), Some(*status));
        }
    }

    #[test]
    fn test_status_invalid_string() {
        assert_eq!(JobStatus::from_db_string("running"), None);
    }

    #[test]
    fn test_job_happy_path_transitions() {
        let mut job = CrawlJob::new("https://example.com/blog");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());

        job.mark_in_progress();
        assert_eq!(job.status, JobStatus::InProgress);

        job.mark_completed();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_failure_records_message() {
        let mut job = CrawlJob::new("https://example.com/blog");
        job.mark_in_progress();
        job.mark_failed("fetch exploded");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("fetch exploded"));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_status_never_regresses() {
        let mut job = CrawlJob::new("https://example.com/blog");
        job.mark_in_progress();
        job.mark_completed();

        // Terminal state: further transitions are refused
        job.mark_in_progress();
        assert_eq!(job.status, JobStatus::Completed);

        job.mark_failed("too late");
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_completed_requires_in_progress() {
        let mut job = CrawlJob::new("https://example.com/blog");
        job.mark_completed();
        assert_eq!(job.status, JobStatus::Pending);
    }
}
