//! Database schema definitions

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl jobs and their lifecycle state
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id TEXT PRIMARY KEY,
    seed_url TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_scraped INTEGER NOT NULL DEFAULT 0,
    posts_found INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_created ON crawl_jobs(created_at);

-- Posts extracted by completed jobs
CREATE TABLE IF NOT EXISTS blog_posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL REFERENCES crawl_jobs(id),
    blog_url TEXT NOT NULL,
    post_url TEXT,
    title TEXT NOT NULL,
    author TEXT,
    published_date TEXT,
    content TEXT NOT NULL,
    excerpt TEXT,
    images TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_job ON blog_posts(job_id);
CREATE INDEX IF NOT EXISTS idx_posts_blog_url ON blog_posts(blog_url);
CREATE INDEX IF NOT EXISTS idx_posts_scraped ON blog_posts(scraped_at);
"#;

/// Applies the schema to a connection. Idempotent.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
