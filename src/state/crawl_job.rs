//! Crawl job counters and page outcomes
//!
//! A `CrawlJob` is owned by the coordinator's aggregation loop; page workers
//! never touch it and report through `PageOutcome` messages instead.

use crate::listing::Category;
use crate::state::JobStatus;
use crate::HarvestError;

/// Result reported by a page worker for exactly one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub page: u32,
    pub success: bool,
    /// Listings newly inserted into the store
    pub new_count: usize,
    /// Listings extracted from the page, inserted or not
    pub records_found: usize,
    pub error: Option<String>,
}

impl PageOutcome {
    pub fn succeeded(page: u32, records_found: usize, new_count: usize) -> Self {
        Self {
            page,
            success: true,
            new_count,
            records_found,
            error: None,
        }
    }

    pub fn failed(page: u32, error: impl Into<String>) -> Self {
        Self {
            page,
            success: false,
            new_count: 0,
            records_found: 0,
            error: Some(error.into()),
        }
    }
}

/// Live state of one crawl
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub category: Category,
    /// Caller-supplied page cap
    pub max_pages: Option<u32>,
    /// Effective page count, known after discovery
    pub total_pages: u32,
    pub completed_pages: u32,
    pub succeeded_pages: u32,
    pub failed_pages: u32,
    pub new_records: usize,
    status: JobStatus,
}

impl CrawlJob {
    pub fn new(category: Category, max_pages: Option<u32>) -> Self {
        Self {
            category,
            max_pages,
            total_pages: 0,
            completed_pages: 0,
            succeeded_pages: 0,
            failed_pages: 0,
            new_records: 0,
            status: JobStatus::Idle,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Moves the job to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: JobStatus) -> Result<(), HarvestError> {
        if !self.status.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::debug!("{} crawl: {} -> {}", self.category, self.status, next);
        self.status = next;
        Ok(())
    }

    /// Applies the page cap to the discovered page count
    ///
    /// Returns the effective number of pages to dispatch. A cap of zero is
    /// treated as "no cap".
    pub fn apply_page_count(&mut self, discovered: u32) -> u32 {
        self.total_pages = match self.max_pages {
            Some(cap) if cap > 0 => discovered.min(cap),
            _ => discovered,
        };
        self.total_pages
    }

    /// Folds one page outcome into the counters
    pub fn record(&mut self, outcome: &PageOutcome) {
        self.completed_pages += 1;
        self.new_records += outcome.new_count;
        if outcome.success {
            self.succeeded_pages += 1;
        } else {
            self.failed_pages += 1;
        }
    }

    /// Returns true once every dispatched page has reported
    pub fn is_drained(&self) -> bool {
        self.completed_pages >= self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cap_limits_discovered_count() {
        let mut job = CrawlJob::new(Category::Villas, Some(5));
        assert_eq!(job.apply_page_count(40), 5);

        let mut job = CrawlJob::new(Category::Villas, Some(50));
        assert_eq!(job.apply_page_count(40), 40);

        let mut job = CrawlJob::new(Category::Villas, None);
        assert_eq!(job.apply_page_count(40), 40);
    }

    #[test]
    fn test_zero_cap_means_uncapped() {
        let mut job = CrawlJob::new(Category::Riads, Some(0));
        assert_eq!(job.apply_page_count(7), 7);
    }

    #[test]
    fn test_record_outcomes() {
        let mut job = CrawlJob::new(Category::Maisons, None);
        job.apply_page_count(3);

        job.record(&PageOutcome::succeeded(2, 20, 4));
        job.record(&PageOutcome::failed(1, "timeout"));
        assert!(!job.is_drained());

        job.record(&PageOutcome::succeeded(3, 18, 18));
        assert!(job.is_drained());
        assert_eq!(job.completed_pages, 3);
        assert_eq!(job.succeeded_pages, 2);
        assert_eq!(job.failed_pages, 1);
        assert_eq!(job.new_records, 22);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut job = CrawlJob::new(Category::Villas, None);
        let err = job.transition(JobStatus::Running).unwrap_err();
        assert!(matches!(
            err,
            HarvestError::InvalidTransition {
                from: JobStatus::Idle,
                to: JobStatus::Running
            }
        ));
        assert_eq!(job.status(), JobStatus::Idle);

        job.transition(JobStatus::Starting).unwrap();
        assert_eq!(job.status(), JobStatus::Starting);
    }

    #[test]
    fn test_failed_outcome_reports_zero_new() {
        let outcome = PageOutcome::failed(4, "Failed to fetch page");
        assert!(!outcome.success);
        assert_eq!(outcome.new_count, 0);
        assert_eq!(outcome.error.as_deref(), Some("Failed to fetch page"));
    }
}
