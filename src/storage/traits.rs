//! Storage traits and error types
//!
//! This module defines the trait interface for listing stores and
//! associated error types.

use crate::listing::{Category, Listing};
use crate::storage::ListingPage;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for listing store implementations
///
/// Implementations must be safe to share between page workers: every method
/// takes `&self` and serializes writes internally.
pub trait ListingStore: Send + Sync {
    // ===== Writes =====

    /// Inserts the listings whose link is not yet stored for `category`
    ///
    /// Existing links are left untouched. The whole batch runs inside one
    /// write transaction; a failing record is logged and skipped, a failing
    /// transaction rolls the batch back and returns an error.
    ///
    /// # Returns
    ///
    /// The number of newly inserted listings
    fn upsert(&self, category: Category, listings: &[Listing]) -> StorageResult<usize>;

    /// Drops every collection and re-provisions empty ones
    fn reset(&self) -> StorageResult<()>;

    // ===== Queries =====

    /// Lists a category's listings, most recent first
    fn list(&self, category: Category, limit: usize, offset: usize) -> StorageResult<ListingPage>;

    /// Counts the listings stored for one category
    fn count(&self, category: Category) -> StorageResult<u64>;

    /// Counts the listings of every category, including empty ones
    fn count_by_category(&self) -> StorageResult<BTreeMap<Category, u64>>;

    /// Returns a category's listings that carry a non-empty link, most recent
    /// first, optionally restricted to those created at or after `min_date`
    fn export_rows(
        &self,
        category: Category,
        min_date: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Listing>>;

    /// Returns every stored link of a category, valid or not
    fn links(&self, category: Category) -> StorageResult<Vec<String>>;
}
