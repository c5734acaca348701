//! CSV export of stored listing links
//!
//! Writes every listing with a valid detail link to a flat CSV file, most
//! recent first within each category. The basic layout has the columns
//! `title,link,category`; the extended layout adds price, location, surface
//! and the scraping date.

use crate::listing::{or_not_available, Category, Listing};
use crate::storage::{ListingStore, StorageError};
use crate::url::is_site_link;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BASIC_HEADER: [&str; 3] = ["title", "link", "category"];
const EXTENDED_HEADER: [&str; 7] = [
    "title",
    "link",
    "category",
    "price",
    "location",
    "surface",
    "scraping_date",
];

/// Errors that can occur while exporting
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Which rows and columns to export
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Categories to export; empty means all
    pub categories: Vec<Category>,

    /// Only listings created at or after this instant
    pub min_date: Option<DateTime<Utc>>,

    /// Row limit per category; `Some(0)` means no limit
    pub max_per_category: Option<usize>,

    /// Write the extended column layout
    pub extended: bool,
}

impl ExportOptions {
    /// Categories in export order, without duplicates
    fn selected_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return Category::ALL.to_vec();
        }
        let mut selected = Vec::new();
        for category in &self.categories {
            if !selected.contains(category) {
                selected.push(*category);
            }
        }
        selected
    }
}

/// Result of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub per_category: BTreeMap<Category, usize>,
    pub total: usize,
}

/// Collapses every whitespace run in a title to a single space
pub fn clean_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exports listing links to a CSV file
///
/// # Arguments
///
/// * `store` - The listing store to read from
/// * `link_domain` - Domain a link must belong to in order to be exported
/// * `path` - Output file, created or truncated
/// * `options` - Row and column selection
///
/// # Returns
///
/// * `Ok(ExportReport)` - Rows written per category
/// * `Err(ExportError)` - Failed to read the store or write the file
pub fn export_links(
    store: &dyn ListingStore,
    link_domain: &str,
    path: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let file = std::fs::File::create(path)?;
    let per_category = write_links(store, link_domain, file, options)?;
    let total = per_category.values().sum();

    for (category, count) in &per_category {
        tracing::info!("{}: {} listings exported", category, count);
    }
    tracing::info!("Exported {} listings to {}", total, path.display());

    Ok(ExportReport {
        path: path.to_path_buf(),
        per_category,
        total,
    })
}

/// Writes the CSV rows to any writer
///
/// # Returns
///
/// The number of rows written per category
pub fn write_links<W: Write>(
    store: &dyn ListingStore,
    link_domain: &str,
    writer: W,
    options: &ExportOptions,
) -> Result<BTreeMap<Category, usize>, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    if options.extended {
        csv.write_record(EXTENDED_HEADER)?;
    } else {
        csv.write_record(BASIC_HEADER)?;
    }

    let limit = options
        .max_per_category
        .filter(|&max| max > 0)
        .unwrap_or(usize::MAX);

    let mut per_category = BTreeMap::new();
    for category in options.selected_categories() {
        let rows: Vec<Listing> = store
            .export_rows(category, options.min_date)?
            .into_iter()
            .filter(|listing| is_site_link(&listing.link, link_domain))
            .take(limit)
            .collect();

        for listing in &rows {
            write_row(&mut csv, listing, options.extended)?;
        }
        per_category.insert(category, rows.len());
    }

    csv.flush()?;
    Ok(per_category)
}

fn write_row<W: Write>(
    csv: &mut csv::Writer<W>,
    listing: &Listing,
    extended: bool,
) -> Result<(), csv::Error> {
    let title = clean_title(&listing.title);
    let category = listing.category.as_str();

    if !extended {
        return csv.write_record([title.as_str(), listing.link.as_str(), category]);
    }

    let scraped = listing
        .created_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string());
    csv.write_record([
        title.as_str(),
        listing.link.as_str(),
        category,
        or_not_available(listing.price.as_deref()),
        or_not_available(listing.location.as_deref()),
        or_not_available(listing.surface.as_deref()),
        or_not_available(scraped.as_deref()),
    ])
}
