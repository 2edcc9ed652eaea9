//! Job dispatch and execution

use crate::config::Config;
use crate::crawler::{crawl, UrlValidator};
use crate::model::CrawlJob;
use crate::render::Renderer;
use crate::storage::JobStore;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

/// Dispatches crawl jobs, bounding how many run at once.
///
/// Each job owns its own rendering session and rate limiter; the only
/// state shared between jobs is the store and the counting gate. The gate
/// capacity comes from `max-concurrent-jobs` in the configuration; a job
/// dispatched while the gate is full waits for a slot.
pub struct JobRunner {
    store: Arc<Mutex<dyn JobStore + Send>>,
    renderer: Arc<dyn Renderer>,
    gate: Arc<Semaphore>,
    config: Config,
}

impl JobRunner {
    pub fn new(
        store: Arc<Mutex<dyn JobStore + Send>>,
        renderer: Arc<dyn Renderer>,
        config: Config,
    ) -> Self {
        let capacity = config.crawler.max_concurrent_jobs as usize;
        Self {
            store,
            renderer,
            gate: Arc::new(Semaphore::new(capacity)),
            config,
        }
    }

    /// Creates a new pending job for `seed_url` and persists it.
    ///
    /// The URL is validated up front; an unsafe URL is rejected here and
    /// no job record is created.
    pub async fn submit(&self, seed_url: &str) -> crate::Result<CrawlJob> {
        UrlValidator::new(&self.config.security).validate(seed_url)?;

        let job = CrawlJob::new(seed_url);
        self.store.lock().await.create_job(&job)?;
        tracing::info!(job = %job.id, url = %seed_url, "Job created");
        Ok(job)
    }

    /// Runs a previously created job to completion.
    ///
    /// Waits for a slot in the concurrency gate, marks the job in progress,
    /// runs the crawl, and finalizes: on success the job's counters are
    /// copied from the crawl stats, its posts are persisted, and it is
    /// marked completed; on any crawl error the job is marked failed with
    /// the error's message and no posts are persisted. A job ID that does
    /// not exist in the store is logged and ignored.
    pub async fn run_job(
        &self,
        job_id: Uuid,
        max_pages: u32,
        fetch_full_content: bool,
    ) -> crate::Result<()> {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                // The gate lives as long as the runner, so this is unreachable
                // in practice
                tracing::error!(job = %job_id, "Job gate closed");
                return Ok(());
            }
        };

        let mut job = {
            let store = self.store.lock().await;
            match store.get_job(job_id)? {
                Some(job) => job,
                None => {
                    tracing::error!(job = %job_id, "Job not found, nothing to run");
                    return Ok(());
                }
            }
        };

        job.mark_in_progress();
        self.store.lock().await.save_job(&job)?;
        tracing::info!(job = %job.id, url = %job.seed_url, "Job started");

        match crawl(
            Arc::clone(&self.renderer),
            &self.config,
            &job.seed_url,
            max_pages,
            fetch_full_content,
        )
        .await
        {
            Ok((posts, stats)) => {
                job.pages_scraped = stats.pages_scraped;
                job.posts_found = stats.posts_found;
                job.mark_completed();

                let mut store = self.store.lock().await;
                store.save_posts(job.id, &posts)?;
                store.save_job(&job)?;

                tracing::info!(
                    job = %job.id,
                    pages = job.pages_scraped,
                    posts = job.posts_found,
                    "Job completed"
                );
            }
            Err(err) => {
                tracing::error!(job = %job.id, error = %err, "Job failed");
                job.mark_failed(&err.to_string());
                self.store.lock().await.save_job(&job)?;
            }
        }

        Ok(())
    }
}
