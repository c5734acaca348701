//! Listing-Harvester: a concurrent classifieds crawler
//!
//! This crate crawls the paginated index of a real-estate classifieds site,
//! extracts listing records, deduplicates them into SQLite and streams crawl
//! progress to live subscribers.

pub mod config;
pub mod crawler;
pub mod listing;
pub mod output;
pub mod progress;
pub mod server;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to discover page count from {url}: {source}")]
    Discovery {
        url: String,
        source: crawler::FetchError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::JobStatus,
        to: state::JobStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown property category: {0}")]
    UnknownCategory(String),
}

// Re-export commonly used types
pub use config::{CategoryRegistry, Config};
pub use listing::{Category, FieldSet, Listing};
pub use progress::{ProgressBroadcaster, ProgressEvent};
pub use state::{CrawlJob, JobStatus, PageOutcome};
