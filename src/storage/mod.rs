//! Storage module for persisting listings
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Deduplicated batch inserts from concurrent page workers
//! - Paginated and aggregate queries
//! - Export reads and administrative reset

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ListingStore, StorageError, StorageResult};

use crate::listing::Listing;
use serde::Serialize;
use std::path::Path;

/// Default page size of the query service
pub const DEFAULT_LIMIT: usize = 50;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// One page of query results
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    /// Number of listings in the whole category
    pub total: u64,
}
