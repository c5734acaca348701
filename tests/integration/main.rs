//! Integration tests for Listing-Harvester

mod crawl_tests;
