//! Job lifecycle management
//!
//! Wraps one crawl run per job: dispatch through a process-wide concurrency
//! gate, status transitions persisted to storage, and finalization of the
//! job's counters and posts.

mod runner;

pub use runner::JobRunner;
