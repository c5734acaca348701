//! Crawler module for index page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Page-count discovery and listing extraction
//! - A bounded pool of page workers
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pool;
mod worker;

pub use coordinator::Coordinator;
pub use extractor::{count_total_pages, ListingExtractor};
pub use fetcher::{build_http_client, FetchError, PageFetcher, RetryPolicy};
pub use pool::WorkerPool;
pub use worker::{PageWorker, SharedStore};

use crate::config::{CategoryRegistry, Config};
use crate::progress::ProgressBroadcaster;
use crate::state::CrawlJob;
use crate::HarvestError;

/// Runs a complete crawl of one category
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resolve the category against the registry
/// 2. Build the HTTP client
/// 3. Discover the page count and dispatch page workers
/// 4. Broadcast progress and the final summary
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `registry` - The category registry
/// * `category` - Public category name, e.g. `villas`
/// * `max_pages` - Optional cap on the number of pages
/// * `store` - Shared listing store
/// * `broadcaster` - Progress fan-out
///
/// # Returns
///
/// * `Ok(CrawlJob)` - Crawl completed
/// * `Err(HarvestError)` - Unknown category or job-fatal failure
pub async fn crawl(
    config: &Config,
    registry: &CategoryRegistry,
    category: &str,
    max_pages: Option<u32>,
    store: SharedStore,
    broadcaster: ProgressBroadcaster,
) -> Result<CrawlJob, HarvestError> {
    let category = registry.resolve(category)?.clone();
    let client = build_http_client(config)?;
    Coordinator::new(category, config, client, store, broadcaster)
        .run(max_pages)
        .await
}
