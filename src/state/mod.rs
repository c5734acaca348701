//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `JobStatus`: lifecycle of a crawl job (starting, discovering, running, ...)
//! - `CrawlJob`: the counters the coordinator aggregates page outcomes into
//! - `PageOutcome`: what a page worker reports for one page

mod crawl_job;
mod job_state;

// Re-export main types
pub use crawl_job::{CrawlJob, PageOutcome};
pub use job_state::JobStatus;
