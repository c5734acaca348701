//! Router assembly and shared handler state

use crate::config::{CategoryRegistry, Config};
use crate::crawler::build_http_client;
use crate::progress::ProgressBroadcaster;
use crate::server::routes;
use crate::storage::SqliteStorage;
use crate::{ConfigError, HarvestError};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<CategoryRegistry>,
    pub store: Arc<SqliteStorage>,
    pub broadcaster: ProgressBroadcaster,
    pub client: Client,
}

impl AppState {
    /// Builds the state from a validated configuration and an opened store
    pub fn new(config: Config, store: Arc<SqliteStorage>) -> Result<Self, HarvestError> {
        let registry = CategoryRegistry::from_config(&config)?;
        let client = build_http_client(&config)?;

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            store,
            broadcaster: ProgressBroadcaster::new(),
            client,
        })
    }
}

/// Builds the HTTP router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/", get(routes::root))
        .route("/properties/:category", get(routes::list_properties))
        .route("/statistics", get(routes::statistics))
        .route("/scrape", post(routes::trigger_crawl))
        .route("/reset-database", post(routes::reset_database))
        .route("/ws", get(routes::progress_socket))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on the configured bind address until the process exits
pub async fn serve(state: AppState) -> Result<(), HarvestError> {
    let addr: SocketAddr = state.config.server.bind.parse().map_err(|_| {
        ConfigError::Validation(format!(
            "server.bind is not a socket address: {}",
            state.config.server.bind
        ))
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
