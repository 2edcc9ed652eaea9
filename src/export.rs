//! JSON export of stored posts

use crate::storage::{JobStore, StoredPost};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// A snapshot of stored posts for export
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub posts: Vec<StoredPost>,
    pub total_posts: u64,
    pub exported_at: DateTime<Utc>,
}

/// Collects every stored post (optionally filtered by blog URL) into an
/// export document, newest first
pub fn build_export(
    store: &dyn JobStore,
    blog_url: Option<&str>,
) -> crate::Result<ExportDocument> {
    let (posts, total_posts) = store.list_posts(blog_url, u32::MAX, 0)?;

    Ok(ExportDocument {
        posts,
        total_posts,
        exported_at: Utc::now(),
    })
}

/// Writes an export document as pretty-printed JSON
pub fn write_export(document: &ExportDocument, path: &Path) -> crate::Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), posts = document.total_posts, "Exported posts");
    Ok(())
}
