//! Output module for exporting listings and reporting statistics
//!
//! This module handles:
//! - Exporting stored listing links to CSV
//! - Reporting how many stored listings carry a usable link

mod export;
pub mod stats;

pub use export::{clean_title, export_links, write_links, ExportError, ExportOptions, ExportReport};
pub use stats::{load_link_statistics, print_link_statistics, CategoryLinkStats, LinkStatistics};
