//! HTTP API
//!
//! This module exposes the store and the crawler over HTTP:
//! - Paginated and aggregate listing queries
//! - Crawl triggering, with progress pushed over a WebSocket
//! - Administrative database reset

mod app;
mod error;
mod routes;

pub use app::{build_router, serve, AppState};
pub use error::ApiError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryEntry, Config};
    use crate::listing::{Category, Listing};
    use crate::storage::{ListingStore, SqliteStorage};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(config: Config) -> AppState {
        let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
        AppState::new(config, store).unwrap()
    }

    fn villa(n: u32) -> Listing {
        Listing::new(
            Category::Villas,
            format!("Villa {}", n),
            format!("https://www.mubawab.ma/fr/a/{}", n),
            "Marrakech",
        )
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_banner() {
        let router = build_router(test_state(Config::default()));
        let (status, body) = send(router, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_list_properties_paginates_most_recent_first() {
        let state = test_state(Config::default());
        for (n, day) in [(1, 1), (2, 5), (3, 3)] {
            let ts = Utc.with_ymd_and_hms(2024, 4, day, 12, 0, 0).unwrap();
            state
                .store
                .upsert_at(Category::Villas, &[villa(n)], ts)
                .unwrap();
        }

        let router = build_router(state);
        let (status, body) = send(router, get("/properties/villas?limit=2&offset=0")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["offset"], 0);
        let properties = body["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0]["title"], "Villa 2");
        assert_eq!(properties[1]["title"], "Villa 3");
    }

    #[tokio::test]
    async fn test_list_properties_defaults() {
        let router = build_router(test_state(Config::default()));
        let (status, body) = send(router, get("/properties/riads")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert_eq!(body["limit"], 50);
        assert_eq!(body["offset"], 0);
    }

    #[tokio::test]
    async fn test_unknown_category_is_client_error() {
        let router = build_router(test_state(Config::default()));
        let (status, body) = send(router, get("/properties/castles")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("castles"));
    }

    #[tokio::test]
    async fn test_statistics_lists_every_category() {
        let state = test_state(Config::default());
        state
            .store
            .upsert(Category::Villas, &[villa(1), villa(2)])
            .unwrap();

        let router = build_router(state);
        let (status, body) = send(router, get("/statistics")).await;

        assert_eq!(status, StatusCode::OK);
        let counts = body.as_object().unwrap();
        assert_eq!(counts.len(), Category::ALL.len());
        assert_eq!(counts["villas"], 2);
        assert_eq!(counts["terrains"], 0);
    }

    #[tokio::test]
    async fn test_reset_database_clears_listings() {
        let state = test_state(Config::default());
        state.store.upsert(Category::Villas, &[villa(1)]).unwrap();
        let store = state.store.clone();

        let router = build_router(state);
        let (status, _) = send(router.clone(), post_json("/reset-database", Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.count(Category::Villas).unwrap(), 0);

        // Idempotent
        let (status, _) = send(router, post_json("/reset-database", Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trigger_rejects_unknown_category() {
        let router = build_router(test_state(Config::default()));
        let request = post_json("/scrape", serde_json::json!({ "property_type": "castles" }));
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_trigger_runs_crawl_in_background() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/villas"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ul><li class="listingBox">
                     <h2 class="listingTit"><a href="/fr/a/1">Villa</a></h2>
                   </li></ul>"#,
            ))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.crawler.base_delay_ms = 0;
        config.crawler.backoff_step_ms = 0;
        config.crawler.retry_delay_ms = 0;
        config.categories = vec![CategoryEntry {
            name: "villas".to_string(),
            index_url: format!("{}/villas", server.uri()),
        }];

        let state = test_state(config);
        let mut subscription = state.broadcaster.subscribe().await;
        let store = state.store.clone();

        let router = build_router(state);
        let request = post_json(
            "/scrape",
            serde_json::json!({ "property_type": "villas", "max_pages": 5 }),
        );
        let (status, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["property_type"], "villas");

        let completed = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let payload = subscription.receiver.recv().await.unwrap();
                let event: Value = serde_json::from_str(&payload).unwrap();
                if event["status"] == "completed" {
                    return event;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(completed["total_pages"], 1);
        assert_eq!(completed["total_properties"], 1);
        assert_eq!(store.count(Category::Villas).unwrap(), 1);
    }
}
