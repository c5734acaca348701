use crate::state::CrawlJob;
use serde::{Deserialize, Serialize};

/// Status tag of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Starting,
    Progress,
    Completed,
    Error,
}

/// One update pushed to live subscribers
///
/// Serialized as a flat JSON object:
/// `{status, message, current_page, total_pages, new_properties, total_properties}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: EventStatus,
    pub message: String,
    pub current_page: u32,
    pub total_pages: u32,
    /// New listings reported by the page this event is about
    pub new_properties: usize,
    /// New listings so far in the whole crawl
    pub total_properties: usize,
}

impl ProgressEvent {
    fn blank(status: EventStatus, message: String) -> Self {
        Self {
            status,
            message,
            current_page: 0,
            total_pages: 0,
            new_properties: 0,
            total_properties: 0,
        }
    }

    /// Completed and error events end a crawl's stream
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, EventStatus::Completed | EventStatus::Error)
    }

    pub fn starting(job: &CrawlJob) -> Self {
        Self::blank(
            EventStatus::Starting,
            format!("Starting {} crawl...", job.category),
        )
    }

    /// Announces the page count before workers are dispatched
    pub fn launched(job: &CrawlJob, workers: usize) -> Self {
        Self {
            total_pages: job.total_pages,
            ..Self::blank(
                EventStatus::Progress,
                format!(
                    "Crawling {} pages of {} with {} workers",
                    job.total_pages, job.category, workers
                ),
            )
        }
    }

    /// Reports one page outcome already folded into `job`
    pub fn page_done(job: &CrawlJob, new_count: usize) -> Self {
        Self {
            status: EventStatus::Progress,
            message: format!(
                "Page {}/{} - {} new listings",
                job.completed_pages, job.total_pages, new_count
            ),
            current_page: job.completed_pages,
            total_pages: job.total_pages,
            new_properties: new_count,
            total_properties: job.new_records,
        }
    }

    pub fn completed(job: &CrawlJob) -> Self {
        let mut message = format!("Crawl finished: {} new listings added", job.new_records);
        if job.failed_pages > 0 {
            message.push_str(&format!(
                " ({}/{} pages succeeded)",
                job.succeeded_pages, job.total_pages
            ));
        }

        Self {
            status: EventStatus::Completed,
            message,
            current_page: job.total_pages,
            total_pages: job.total_pages,
            new_properties: 0,
            total_properties: job.new_records,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::blank(EventStatus::Error, format!("Crawl failed: {}", message))
    }
}
