//! Crawl coordinator - main crawl orchestration logic
//!
//! This module drives one crawl job from trigger to final broadcast:
//! - Discovering the page count from the first index page
//! - Dispatching one page worker per page through the bounded pool
//! - Folding page outcomes into the job counters as they arrive
//! - Broadcasting a progress event per outcome and a final summary
//!
//! Workers never touch the counters. They send their outcome over a channel
//! and a single aggregation task owns the `CrawlJob` while pages are running.

use crate::config::{CategoryConfig, Config};
use crate::crawler::worker::{PageWorker, SharedStore};
use crate::crawler::{count_total_pages, ListingExtractor, PageFetcher, RetryPolicy, WorkerPool};
use crate::progress::{ProgressBroadcaster, ProgressEvent};
use crate::state::{CrawlJob, JobStatus, PageOutcome};
use crate::url::page_url;
use crate::HarvestError;
use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Main crawl coordinator structure
pub struct Coordinator {
    category: CategoryConfig,
    fetcher: PageFetcher,
    worker: Arc<PageWorker>,
    pool: WorkerPool,
    broadcaster: ProgressBroadcaster,
}

impl Coordinator {
    /// Creates a coordinator for one category
    ///
    /// # Arguments
    ///
    /// * `category` - The resolved category to crawl
    /// * `config` - The harvester configuration
    /// * `client` - Shared HTTP client
    /// * `store` - Shared listing store
    /// * `broadcaster` - Progress fan-out
    pub fn new(
        category: CategoryConfig,
        config: &Config,
        client: Client,
        store: SharedStore,
        broadcaster: ProgressBroadcaster,
    ) -> Self {
        let fetcher = PageFetcher::new(client, RetryPolicy::from_config(&config.crawler));
        let extractor = ListingExtractor::new(&category, &config.site);
        let worker = PageWorker::new(&category, fetcher.clone(), extractor, store);

        Self {
            category,
            fetcher,
            worker: Arc::new(worker),
            pool: WorkerPool::new(config.crawler.max_workers as usize),
            broadcaster,
        }
    }

    /// Runs the crawl to completion
    ///
    /// A failure anywhere outside individual pages ends the job: an error
    /// event is broadcast and the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlJob)` - The completed job with its final counters
    /// * `Err(HarvestError)` - The job failed
    pub async fn run(self, max_pages: Option<u32>) -> Result<CrawlJob, HarvestError> {
        let mut job = CrawlJob::new(self.category.category, max_pages);

        match self.execute(&mut job).await {
            Ok(()) => Ok(job),
            Err(e) => {
                tracing::error!("{} crawl failed: {}", self.category.category, e);
                if let Err(transition) = job.transition(JobStatus::Failed) {
                    tracing::debug!("{}", transition);
                }
                self.broadcaster.broadcast(&ProgressEvent::error(&e)).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &mut CrawlJob) -> Result<(), HarvestError> {
        job.transition(JobStatus::Starting)?;
        self.broadcaster.broadcast(&ProgressEvent::starting(job)).await;

        job.transition(JobStatus::Discovering)?;
        let first_url = page_url(&self.category.index_url, 1);
        let first_page = self
            .fetcher
            .fetch(&first_url)
            .await
            .map_err(|source| HarvestError::Discovery {
                url: first_url.clone(),
                source,
            })?;
        let discovered = count_total_pages(&first_page);
        let total = job.apply_page_count(discovered);

        job.transition(JobStatus::Running)?;
        tracing::info!(
            "Crawling {} pages of {} ({} discovered) with {} workers",
            total,
            self.category.category,
            discovered,
            self.pool.size()
        );
        self.broadcaster
            .broadcast(&ProgressEvent::launched(job, self.pool.size()))
            .await;

        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(aggregate(job.clone(), rx, self.broadcaster.clone()));

        let mut handles = Vec::with_capacity(total as usize);
        for page in 1..=total {
            let worker = Arc::clone(&self.worker);
            let tx = tx.clone();
            let handle = self.pool.spawn(run_page(worker, page, tx)).await?;
            handles.push((page, handle));
        }

        for (page, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker for page {} was lost: {}", page, e);
                let _ = tx.send(PageOutcome::failed(page, e.to_string()));
            }
        }
        drop(tx);

        let mut finished = aggregator
            .await
            .map_err(|e| HarvestError::Worker(format!("aggregation task failed: {}", e)))?;

        finished.transition(JobStatus::Aggregating)?;
        finished.transition(JobStatus::Completed)?;
        *job = finished;

        tracing::info!(
            "{} crawl finished: {} pages succeeded, {} failed, {} new listings",
            job.category,
            job.succeeded_pages,
            job.failed_pages,
            job.new_records
        );
        self.broadcaster.broadcast(&ProgressEvent::completed(job)).await;

        Ok(())
    }
}

/// Runs one page and hands its outcome to the aggregator
///
/// A panic inside the worker becomes a failed outcome so every dispatched
/// page reports exactly once.
async fn run_page(
    worker: Arc<PageWorker>,
    page: u32,
    tx: mpsc::UnboundedSender<PageOutcome>,
) {
    let outcome = match AssertUnwindSafe(worker.process_page(page))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Worker for page {} panicked: {}", page, message);
            PageOutcome::failed(page, message)
        }
    };

    if tx.send(outcome).is_err() {
        tracing::warn!("Aggregator gone; outcome of page {} dropped", page);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Folds outcomes into `job` until every page reported or all senders left
async fn aggregate(
    mut job: CrawlJob,
    mut rx: mpsc::UnboundedReceiver<PageOutcome>,
    broadcaster: ProgressBroadcaster,
) -> CrawlJob {
    while !job.is_drained() {
        let Some(outcome) = rx.recv().await else {
            tracing::warn!(
                "Outcome channel closed after {}/{} pages",
                job.completed_pages,
                job.total_pages
            );
            break;
        };

        job.record(&outcome);
        broadcaster
            .broadcast(&ProgressEvent::page_done(&job, outcome.new_count))
            .await;
    }
    job
}
