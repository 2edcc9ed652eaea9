//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Crawl job persistence across the job lifecycle
//! - Extracted post storage and querying

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::model::ExtractedPost;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open or migrate the database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// A persisted post, as read back from the database
#[derive(Debug, Clone, Serialize)]
pub struct StoredPost {
    pub id: i64,
    pub job_id: Uuid,
    pub blog_url: String,
    pub post_url: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub content: String,
    pub excerpt: Option<String>,
    pub images: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

impl StoredPost {
    /// Builds the row to insert for an extracted post
    pub(crate) fn from_extracted(job_id: Uuid, post: &ExtractedPost) -> Self {
        Self {
            id: 0,
            job_id,
            blog_url: post.blog_url.clone(),
            post_url: post.post_url.clone(),
            title: post.title.clone(),
            author: post.author.clone(),
            published_date: post.published_date,
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            images: post.images.clone(),
            scraped_at: post.scraped_at,
        }
    }
}
