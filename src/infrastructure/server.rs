//! Scrape-service HTTP surface
//!
//! A small GET-only JSON API over the acquisition tier: callers name a
//! target (category, symbol, bunker grade or arbitrary URL) and receive
//! the rendered markup as `{ "data": "<html>" }`, or `{ "error", "message" }`
//! with a matching status on failure. The surface serves markup, not
//! parsed records; extraction stays with the library consumers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::domain::{BunkerType, Category};
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::fetcher::{MarkupSource, ScrapeTarget};

/// Shared handler state
#[derive(Clone)]
pub struct ServerState {
    pub source: Arc<dyn MarkupSource>,
}

#[derive(Debug, Serialize)]
struct ScrapeData {
    data: String,
}

#[derive(Debug, Serialize)]
struct ScrapeError {
    error: String,
    message: String,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ScrapeError {
            error: "invalid_request".to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

fn scrape_failure(err: crate::infrastructure::errors::FetchError) -> Response {
    error!("Scrape request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ScrapeError {
            error: "scrape_failed".to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

async fn resolve(state: &ServerState, target: ScrapeTarget) -> Response {
    match state.source.markup(&target).await {
        Ok(data) => (StatusCode::OK, Json(ScrapeData { data })).into_response(),
        Err(err) => scrape_failure(err),
    }
}

#[derive(Debug, Deserialize)]
struct GenericQuery {
    url: Option<String>,
}

async fn scrape_generic(
    State(state): State<ServerState>,
    Query(query): Query<GenericQuery>,
) -> Response {
    let Some(raw) = query.url else {
        return bad_request("missing required query parameter: url");
    };
    if url::Url::parse(&raw).is_err() {
        return bad_request(format!("not a valid URL: {raw}"));
    }
    resolve(&state, ScrapeTarget::Generic(raw)).await
}

async fn scrape_category(
    State(state): State<ServerState>,
    Path(raw): Path<String>,
) -> Response {
    match Category::from_str(&raw) {
        Ok(category) => resolve(&state, ScrapeTarget::Category(category)).await,
        Err(_) => bad_request(format!("unknown category: {raw}")),
    }
}

async fn scrape_symbol(State(state): State<ServerState>, Path(symbol): Path<String>) -> Response {
    if symbol.trim().is_empty() {
        return bad_request("symbol must not be empty");
    }
    resolve(&state, ScrapeTarget::Symbol(symbol)).await
}

#[derive(Debug, Deserialize)]
struct BunkerQuery {
    #[serde(rename = "type")]
    bunker_type: Option<String>,
}

async fn scrape_bunker(
    State(state): State<ServerState>,
    Query(query): Query<BunkerQuery>,
) -> Response {
    let Some(raw) = query.bunker_type else {
        return bad_request("missing required query parameter: type");
    };
    match BunkerType::parse(&raw) {
        Some(bunker_type) => resolve(&state, ScrapeTarget::Bunker(bunker_type)).await,
        None => bad_request(format!("unknown bunker type: {raw}")),
    }
}

async fn scrape_bunker_emea(State(state): State<ServerState>) -> Response {
    resolve(&state, ScrapeTarget::BunkerEmea).await
}

async fn health() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "OK" }))).into_response()
}

/// Assemble the scrape-service router over a markup source.
pub fn build_router(source: Arc<dyn MarkupSource>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scrape/generic", get(scrape_generic))
        .route("/scrape/category/:category", get(scrape_category))
        .route("/scrape/symbol/:symbol", get(scrape_symbol))
        .route("/scrape/bunker", get(scrape_bunker))
        .route("/scrape/bunker/emea", get(scrape_bunker_emea))
        .route("/health", get(health))
        .layer(cors)
        .with_state(ServerState { source })
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve(
    config: &ServerConfig,
    source: Arc<dyn MarkupSource>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Scrape service listening on {}", addr);

    axum::serve(listener, build_router(source))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
