//! Configuration module for Listing-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and builds the immutable category registry every component is handed.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvester::config::{load_config, CategoryRegistry};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! let registry = CategoryRegistry::from_config(&config).unwrap();
//! println!("{} categories configured", registry.len());
//! ```

mod parser;
mod registry;
mod types;
mod validation;

pub use registry::{CategoryConfig, CategoryRegistry};
pub use types::{CategoryEntry, Config, CrawlerConfig, OutputConfig, ServerConfig, SiteConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
