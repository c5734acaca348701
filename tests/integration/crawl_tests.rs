//! Integration tests for the crawler
//!
//! These tests use wiremock to serve category index pages and drive the
//! full crawl cycle end-to-end against an on-disk database.

use listing_harvester::config::{CategoryEntry, CategoryRegistry, Config};
use listing_harvester::crawler::{crawl, FetchError, PageFetcher, RetryPolicy, SharedStore};
use listing_harvester::listing::Category;
use listing_harvester::output::{export_links, ExportOptions};
use listing_harvester::progress::{EventStatus, ProgressBroadcaster, ProgressEvent, Subscription};
use listing_harvester::storage::{ListingStore, SqliteStorage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing `villas` at the mock server
fn create_test_config(server: &MockServer, db_path: &str) -> Config {
    let mut config = Config::default();
    config.crawler.max_workers = 3;
    config.crawler.base_delay_ms = 0;
    config.crawler.backoff_step_ms = 0;
    config.crawler.retry_delay_ms = 0;
    config.output.database_path = db_path.to_string();
    config.categories = vec![CategoryEntry {
        name: "villas".to_string(),
        index_url: format!("{}/villas", server.uri()),
    }];
    config
}

fn open_store(dir: &TempDir) -> (Arc<SqliteStorage>, String) {
    let db_path = dir.path().join("listings.db");
    let store = SqliteStorage::new(&db_path).expect("Failed to open database");
    (Arc::new(store), db_path.to_string_lossy().into_owned())
}

fn villa_block(id: u32) -> String {
    format!(
        r#"<li class="listingBox">
             <h2 class="listingTit"><a href="/fr/a/{id}">Villa {id}</a></h2>
             <span class="priceTag">{id} 000 000 DH</span>
             <span class="listingH3">Palmeraie</span>
           </li>"#
    )
}

fn drain(subscription: &mut Subscription) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(payload) = subscription.receiver.try_recv() {
        events.push(serde_json::from_str(&payload).expect("Event is not valid JSON"));
    }
    events
}

#[tokio::test]
async fn test_single_page_crawl_with_malformed_count() {
    let mock_server = MockServer::start().await;

    // Result count is unreadable, so discovery falls back to one page
    let body = format!(
        r#"<span id="numResults">plusieurs annonces</span><input id="pageSize" value="20">
           <ul>{}{}<li class="listingBox"><h2 class="listingTit">No link</h2></li></ul>"#,
        villa_block(1),
        villa_block(2)
    );
    Mock::given(method("GET"))
        .and(path("/villas"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();
    let broadcaster = ProgressBroadcaster::new();
    let mut subscription = broadcaster.subscribe().await;

    let shared: SharedStore = store.clone();
    let job = crawl(&config, &registry, "villas", None, shared, broadcaster)
        .await
        .expect("Crawl should complete");

    assert_eq!(job.total_pages, 1);
    assert_eq!(job.new_records, 2);
    assert_eq!(job.succeeded_pages, 1);
    assert_eq!(job.failed_pages, 0);

    let events = drain(&mut subscription);
    let last = events.last().expect("No events broadcast");
    assert_eq!(last.status, EventStatus::Completed);
    assert_eq!(last.total_pages, 1);
    assert_eq!(last.total_properties, 2);
    assert!(!last.message.contains("pages succeeded"));

    let page = store.list(Category::Villas, 50, 0).unwrap();
    assert_eq!(page.total, 2);
    assert!(page
        .listings
        .iter()
        .all(|l| l.link.starts_with("https://www.mubawab.ma/fr/a/")));
}

#[tokio::test]
async fn test_second_crawl_adds_nothing_new() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/villas"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!("{}{}", villa_block(1), villa_block(2))),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();

    let first = crawl(&config, &registry, "villas", None, store.clone(), ProgressBroadcaster::new())
        .await
        .unwrap();
    let second = crawl(&config, &registry, "villas", None, store.clone(), ProgressBroadcaster::new())
        .await
        .unwrap();

    assert_eq!(first.new_records, 2);
    assert_eq!(second.new_records, 0);
    assert_eq!(store.count(Category::Villas).unwrap(), 2);
}

#[tokio::test]
async fn test_page_cap_bounds_dispatch() {
    let mock_server = MockServer::start().await;

    // 100 results at 20 per page: five pages discovered
    let first_page = format!(
        r#"<span id="numResults">100 annonces</span><input id="pageSize" value="20">{}"#,
        villa_block(1)
    );

    // Page 1 is fetched once for discovery and once by its worker
    Mock::given(method("GET"))
        .and(path("/villas"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villas:p:2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(villa_block(2)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villas:p:3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(villa_block(3)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();

    let job = crawl(&config, &registry, "villas", Some(2), store.clone(), ProgressBroadcaster::new())
        .await
        .unwrap();

    assert_eq!(job.total_pages, 2);
    assert_eq!(job.completed_pages, 2);
    assert_eq!(job.new_records, 2);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_failing_page_does_not_abort_siblings() {
    let mock_server = MockServer::start().await;
    let first_page = format!(
        r#"<span id="numResults">60</span><input id="pageSize" value="20">{}"#,
        villa_block(1)
    );
    Mock::given(method("GET"))
        .and(path("/villas"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villas:p:2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/villas:p:3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(villa_block(3)))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();
    let broadcaster = ProgressBroadcaster::new();
    let mut subscription = broadcaster.subscribe().await;

    let job = crawl(&config, &registry, "villas", None, store.clone(), broadcaster)
        .await
        .unwrap();

    assert_eq!(job.total_pages, 3);
    assert_eq!(job.succeeded_pages, 2);
    assert_eq!(job.failed_pages, 1);
    assert_eq!(job.new_records, 2);

    let events = drain(&mut subscription);
    let page_events = events
        .iter()
        .filter(|e| e.status == EventStatus::Progress && e.current_page > 0)
        .count();
    assert_eq!(page_events, 3);
    assert!(events
        .last()
        .unwrap()
        .message
        .contains("(2/3 pages succeeded)"));
}

#[tokio::test]
async fn test_fetcher_stops_after_three_attempts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        backoff_step: Duration::ZERO,
        retry_delay: Duration::ZERO,
    };
    let fetcher = PageFetcher::new(reqwest::Client::new(), policy);

    let result = fetcher.fetch(&format!("{}/down", mock_server.uri())).await;
    match result {
        Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected exhausted retries, got {:?}", other),
    }

    mock_server.verify().await;
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();

    let result = crawl(&config, &registry, "castles", None, store, ProgressBroadcaster::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_crawl_then_export() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/villas"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!("{}{}", villa_block(1), villa_block(2))),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = open_store(&dir);
    let config = create_test_config(&mock_server, &db_path);
    let registry = CategoryRegistry::from_config(&config).unwrap();

    crawl(&config, &registry, "villas", None, store.clone(), ProgressBroadcaster::new())
        .await
        .unwrap();

    let csv_path = dir.path().join("links.csv");
    let options = ExportOptions {
        categories: vec![Category::Villas],
        extended: true,
        ..ExportOptions::default()
    };
    let report = export_links(store.as_ref(), &config.site.link_domain, &csv_path, &options).unwrap();

    assert_eq!(report.total, 2);
    let written = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("title,link,category,price,location,surface,scraping_date")
    );
    assert_eq!(lines.count(), 2);
    assert!(written.contains("Palmeraie"));
}
