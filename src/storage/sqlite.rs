//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::model::{CrawlJob, ExtractedPost, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::StoredPost;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl JobStore for SqliteStore {
    fn create_job(&mut self, job: &CrawlJob) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO crawl_jobs
                (id, seed_url, status, pages_scraped, posts_found, error_message, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id.to_string(),
                job.seed_url,
                job.status.to_db_string(),
                job.pages_scraped,
                job.posts_found,
                job.error_message,
                job.created_at.to_rfc3339(),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, id: Uuid) -> StorageResult<Option<CrawlJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, status, pages_scraped, posts_found, error_message, created_at, completed_at
             FROM crawl_jobs WHERE id = ?1",
        )?;

        let job = stmt
            .query_row(params![id.to_string()], job_from_row)
            .optional()?;
        Ok(job)
    }

    fn save_job(&mut self, job: &CrawlJob) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_jobs
             SET status = ?2, pages_scraped = ?3, posts_found = ?4,
                 error_message = ?5, completed_at = ?6
             WHERE id = ?1",
            params![
                job.id.to_string(),
                job.status.to_db_string(),
                job.pages_scraped,
                job.posts_found,
                job.error_message,
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::JobNotFound(job.id));
        }
        Ok(())
    }

    fn list_jobs(&self, limit: u32, offset: u32) -> StorageResult<Vec<CrawlJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, status, pages_scraped, posts_found, error_message, created_at, completed_at
             FROM crawl_jobs ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;

        let jobs = stmt
            .query_map(params![limit, offset], job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn save_posts(&mut self, job_id: Uuid, posts: &[ExtractedPost]) -> StorageResult<u32> {
        let tx = self.conn.transaction()?;
        let mut written = 0u32;

        for post in posts {
            let record = StoredPost::from_extracted(job_id, post);
            let images = serde_json::to_string(&record.images)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            tx.execute(
                "INSERT INTO blog_posts
                    (job_id, blog_url, post_url, title, author, published_date,
                     content, excerpt, images, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.job_id.to_string(),
                    record.blog_url,
                    record.post_url,
                    record.title,
                    record.author,
                    record.published_date.map(|t| t.to_rfc3339()),
                    record.content,
                    record.excerpt,
                    images,
                    record.scraped_at.to_rfc3339(),
                ],
            )?;
            written += 1;
        }

        tx.commit()?;
        Ok(written)
    }

    fn get_post(&self, id: i64) -> StorageResult<Option<StoredPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_id, blog_url, post_url, title, author, published_date,
                    content, excerpt, images, scraped_at
             FROM blog_posts WHERE id = ?1",
        )?;

        let post = stmt.query_row(params![id], post_from_row).optional()?;
        Ok(post)
    }

    fn list_posts(
        &self,
        blog_url: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StorageResult<(Vec<StoredPost>, u64)> {
        let (posts, total) = match blog_url {
            Some(url) => {
                let total: u64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM blog_posts WHERE blog_url = ?1",
                    params![url],
                    |row| row.get(0),
                )?;
                let mut stmt = self.conn.prepare(
                    "SELECT id, job_id, blog_url, post_url, title, author, published_date,
                            content, excerpt, images, scraped_at
                     FROM blog_posts WHERE blog_url = ?1
                     ORDER BY scraped_at DESC, id DESC LIMIT ?2 OFFSET ?3",
                )?;
                let posts = stmt
                    .query_map(params![url, limit, offset], post_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                (posts, total)
            }
            None => {
                let total: u64 =
                    self.conn
                        .query_row("SELECT COUNT(*) FROM blog_posts", [], |row| row.get(0))?;
                let mut stmt = self.conn.prepare(
                    "SELECT id, job_id, blog_url, post_url, title, author, published_date,
                            content, excerpt, images, scraped_at
                     FROM blog_posts
                     ORDER BY scraped_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                )?;
                let posts = stmt
                    .query_map(params![limit, offset], post_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                (posts, total)
            }
        };

        Ok((posts, total))
    }
}

fn job_from_row(row: &Row) -> rusqlite::Result<CrawlJob> {
    Ok(CrawlJob {
        id: uuid_column(row, 0)?,
        seed_url: row.get(1)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(2)?)
            .unwrap_or(JobStatus::Pending),
        pages_scraped: row.get(3)?,
        posts_found: row.get(4)?,
        error_message: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        completed_at: optional_timestamp_column(row, 7)?,
    })
}

fn post_from_row(row: &Row) -> rusqlite::Result<StoredPost> {
    let images_json: String = row.get(9)?;
    let images: Vec<String> = serde_json::from_str(&images_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(StoredPost {
        id: row.get(0)?,
        job_id: uuid_column(row, 1)?,
        blog_url: row.get(2)?,
        post_url: row.get(3)?,
        title: row.get(4)?,
        author: row.get(5)?,
        published_date: optional_timestamp_column(row, 6)?,
        content: row.get(7)?,
        excerpt: row.get(8)?,
        images,
        scraped_at: timestamp_column(row, 10)?,
    })
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(text) => parse_timestamp(&text)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn parse_timestamp(text: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc))
}
