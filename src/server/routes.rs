//! Request handlers
//!
//! Store calls run on the blocking pool since the SQLite connection is
//! synchronous.

use crate::crawler::{Coordinator, SharedStore};
use crate::listing::Listing;
use crate::progress::ProgressBroadcaster;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::storage::{ListingStore, DEFAULT_LIMIT};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PropertiesResponse {
    pub properties: Vec<Listing>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub property_type: String,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CrawlAccepted {
    pub message: String,
    pub property_type: String,
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Listing harvester API".to_string(),
    })
}

/// `GET /properties/:category`, most recent first
pub async fn list_properties(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PropertiesResponse>, ApiError> {
    let category = state.registry.resolve(&category)?.category;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let store = state.store.clone();
    let page = tokio::task::spawn_blocking(move || store.list(category, limit, offset)).await??;

    Ok(Json(PropertiesResponse {
        properties: page.listings,
        total: page.total,
        limit,
        offset,
    }))
}

/// `GET /statistics`: stored listings per configured category
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<&'static str, u64>>, ApiError> {
    let store = state.store.clone();
    let counts = tokio::task::spawn_blocking(move || store.count_by_category()).await??;

    let body = state
        .registry
        .iter()
        .map(|entry| {
            let count = counts.get(&entry.category).copied().unwrap_or(0);
            (entry.category.as_str(), count)
        })
        .collect();

    Ok(Json(body))
}

/// `POST /scrape`: starts a crawl in the background and returns at once
///
/// Progress and failures of the crawl only reach WebSocket subscribers.
pub async fn trigger_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<(StatusCode, Json<CrawlAccepted>), ApiError> {
    let category = state.registry.resolve(&request.property_type)?.clone();
    let name = category.category.as_str().to_string();

    let store: SharedStore = state.store.clone();
    let coordinator = Coordinator::new(
        category,
        &state.config,
        state.client.clone(),
        store,
        state.broadcaster.clone(),
    );

    let max_pages = request.max_pages;
    tokio::spawn(async move {
        // Failures were already logged and broadcast by the coordinator
        if let Ok(job) = coordinator.run(max_pages).await {
            tracing::info!(
                "{} crawl done: {} new listings from {} pages",
                job.category,
                job.new_records,
                job.total_pages
            );
        }
    });

    tracing::info!("Crawl of {} accepted (max pages: {:?})", name, max_pages);
    Ok((
        StatusCode::OK,
        Json(CrawlAccepted {
            message: format!("Scraping started for {}", name),
            property_type: name,
        }),
    ))
}

/// `POST /reset-database`
pub async fn reset_database(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.reset()).await??;

    Ok(Json(MessageResponse {
        message: "Database reset successfully".to_string(),
    }))
}

/// `GET /ws`: live progress channel
pub async fn progress_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| forward_progress(socket, state.broadcaster))
}

async fn forward_progress(socket: WebSocket, broadcaster: ProgressBroadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = broadcaster.subscribe().await;

    loop {
        tokio::select! {
            event = subscription.receiver.recv() => match event {
                Some(payload) => {
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            // Inbound frames are keep-alives
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    broadcaster.unsubscribe(subscription.id).await;
}
