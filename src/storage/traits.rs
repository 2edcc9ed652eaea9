//! Storage traits and error types

use crate::model::{CrawlJob, ExtractedPost};
use crate::storage::StoredPost;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job and post storage backends
///
/// Implementations are not required to be thread-safe; callers share one
/// instance behind a mutex.
pub trait JobStore {
    /// Inserts a newly created job
    fn create_job(&mut self, job: &CrawlJob) -> StorageResult<()>;

    /// Gets a job by ID, or `None` if it was never created
    fn get_job(&self, id: Uuid) -> StorageResult<Option<CrawlJob>>;

    /// Writes a job's current state over its stored row
    fn save_job(&mut self, job: &CrawlJob) -> StorageResult<()>;

    /// Lists jobs, newest first
    fn list_jobs(&self, limit: u32, offset: u32) -> StorageResult<Vec<CrawlJob>>;

    /// Persists the posts produced by one job's crawl, returning how many
    /// rows were written
    fn save_posts(&mut self, job_id: Uuid, posts: &[ExtractedPost]) -> StorageResult<u32>;

    /// Gets a stored post by row ID
    fn get_post(&self, id: i64) -> StorageResult<Option<StoredPost>>;

    /// Lists stored posts, newest first, optionally filtered by blog URL.
    /// Returns the page of posts and the total count matching the filter.
    fn list_posts(
        &self,
        blog_url: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StorageResult<(Vec<StoredPost>, u64)>;
}
