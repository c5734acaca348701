//! Page worker
//!
//! A worker handles exactly one index page: fetch, extract, store. Whatever
//! happens, it reports exactly one `PageOutcome`.

use crate::config::CategoryConfig;
use crate::crawler::{ListingExtractor, PageFetcher};
use crate::listing::Category;
use crate::state::PageOutcome;
use crate::storage::ListingStore;
use crate::url::page_url;
use std::sync::Arc;

/// Store handle shared by every worker of a crawl
pub type SharedStore = Arc<dyn ListingStore>;

/// Processes single index pages of one category
#[derive(Clone)]
pub struct PageWorker {
    category: Category,
    index_url: String,
    fetcher: PageFetcher,
    extractor: ListingExtractor,
    store: SharedStore,
}

impl PageWorker {
    pub fn new(
        category: &CategoryConfig,
        fetcher: PageFetcher,
        extractor: ListingExtractor,
        store: SharedStore,
    ) -> Self {
        Self {
            category: category.category,
            index_url: category.index_url.clone(),
            fetcher,
            extractor,
            store,
        }
    }

    /// Fetches, parses and stores one page
    ///
    /// A fetch failure yields a failed outcome without touching the store. A
    /// store failure is logged and reported as zero new listings; the page
    /// itself still counts as succeeded.
    pub async fn process_page(&self, page: u32) -> PageOutcome {
        let url = page_url(&self.index_url, page);

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(
                    "{} page {} ({}) failed: {}",
                    self.category,
                    page,
                    url,
                    e
                );
                return PageOutcome::failed(page, format!("Failed to fetch page: {}", e));
            }
        };

        let listings = self.extractor.parse_listings(&html);
        let found = listings.len();

        let store = Arc::clone(&self.store);
        let category = self.category;
        let stored = tokio::task::spawn_blocking(move || store.upsert(category, &listings)).await;

        let new_count = match stored {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                tracing::error!(
                    "Storing {} listings of {} page {} failed: {}",
                    found,
                    self.category,
                    page,
                    e
                );
                0
            }
            Err(e) => {
                tracing::error!("{} page {} store task died: {}", self.category, page, e);
                return PageOutcome::failed(page, format!("Store task failed: {}", e));
            }
        };

        tracing::info!(
            "{} page {}: {} listings, {} new",
            self.category,
            page,
            found,
            new_count
        );
        PageOutcome::succeeded(page, found, new_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::crawler::RetryPolicy;
    use crate::listing::{FieldSet, Listing};
    use crate::storage::{ListingPage, SqliteStorage, StorageError, StorageResult};
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <li class="listingBox"><h2 class="listingTit"><a href="/fr/a/1">Villa 1</a></h2></li>
        <li class="listingBox"><h2 class="listingTit"><a href="/fr/a/2">Villa 2</a></h2></li>
    "#;

    /// Store whose every write fails
    struct BrokenStore;

    impl ListingStore for BrokenStore {
        fn upsert(&self, _: Category, _: &[Listing]) -> StorageResult<usize> {
            Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery))
        }
        fn reset(&self) -> StorageResult<()> {
            Ok(())
        }
        fn list(&self, _: Category, _: usize, _: usize) -> StorageResult<ListingPage> {
            Ok(ListingPage {
                listings: Vec::new(),
                total: 0,
            })
        }
        fn count(&self, _: Category) -> StorageResult<u64> {
            Ok(0)
        }
        fn count_by_category(&self) -> StorageResult<BTreeMap<Category, u64>> {
            Ok(BTreeMap::new())
        }
        fn export_rows(
            &self,
            _: Category,
            _: Option<DateTime<Utc>>,
        ) -> StorageResult<Vec<Listing>> {
            Ok(Vec::new())
        }
        fn links(&self, _: Category) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn worker(server: &MockServer, store: SharedStore) -> PageWorker {
        let category = CategoryConfig {
            category: Category::Villas,
            index_url: format!("{}/villas", server.uri()),
            field_set: FieldSet::Standard,
        };
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            backoff_step: Duration::ZERO,
            retry_delay: Duration::ZERO,
        };
        let extractor = ListingExtractor::new(&category, &SiteConfig::default());
        PageWorker::new(
            &category,
            PageFetcher::new(reqwest::Client::new(), policy),
            extractor,
            store,
        )
    }

    #[tokio::test]
    async fn test_page_is_stored_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/villas:p:2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
        let worker = worker(&server, store.clone());

        let first = worker.process_page(2).await;
        assert_eq!(first, PageOutcome::succeeded(2, 2, 2));

        let second = worker.process_page(2).await;
        assert_eq!(second, PageOutcome::succeeded(2, 2, 0));
        assert_eq!(store.count(Category::Villas).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
        let outcome = worker(&server, store.clone()).process_page(1).await;

        assert!(!outcome.success);
        assert_eq!(outcome.new_count, 0);
        assert!(outcome.error.unwrap().starts_with("Failed to fetch page"));
        assert_eq!(store.count(Category::Villas).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_reports_zero_new() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/villas"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let outcome = worker(&server, Arc::new(BrokenStore)).process_page(1).await;
        assert_eq!(outcome, PageOutcome::succeeded(1, 2, 0));
    }
}
