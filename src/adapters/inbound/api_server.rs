//! Entertainment API Server
//!
//! HTTP surface for the catalog and the backend relay: the generic
//! upstream proxy, the movie and comic filters, and the failover catalog
//! with its source controls.

use crate::application::{MovieCatalog, MovieFilterParams, RelayService};
use crate::domain::entities::{CatalogResponse, Source};
use crate::domain::errors::RelayError;
use crate::domain::services::filter_planner::{ComicFilterQuery, MovieFilterQuery};
use crate::infrastructure::shutdown::{shutdown_signal, ShutdownController};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Query for `/entertainment/proxy`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<u32>,
}

/// Body for `PUT /entertainment/movies/sources/active`.
#[derive(Debug, Clone, Deserialize)]
pub struct PinRequest {
    pub name: String,
}

/// Health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_source: String,
    pub cache_entries: usize,
}

/// Registry snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesResponse {
    pub sources: Vec<Source>,
    pub active: String,
    pub active_index: usize,
    pub state: crate::application::SourceState,
    pub pinned: bool,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<MovieCatalog>,
    pub relay: Arc<RelayService>,
    pub shutdown: ShutdownController,
}

impl ApiState {
    pub fn new(
        catalog: Arc<MovieCatalog>,
        relay: Arc<RelayService>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            catalog,
            relay,
            shutdown,
        }
    }

    pub fn sources(&self) -> SourcesResponse {
        let registry = self.catalog.registry();
        SourcesResponse {
            sources: registry.list_sources().to_vec(),
            active: registry.active().name,
            active_index: registry.active_index(),
            state: registry.state(),
            pinned: registry.is_pinned(),
        }
    }
}

/// Build the router with all entertainment routes.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(health_handler))
        // Backend relay
        .route("/entertainment/proxy", get(proxy_handler))
        .route("/entertainment/filter", get(movie_filter_handler))
        .route("/entertainment/comics/categories", get(comic_categories_handler))
        .route("/entertainment/comics/filter", get(comic_filter_handler))
        // Failover catalog
        .route("/entertainment/movies/home", get(home_handler))
        .route("/entertainment/movies/list/:slug", get(list_handler))
        .route("/entertainment/movies/search", get(search_handler))
        .route("/entertainment/movies/categories", get(categories_handler))
        .route("/entertainment/movies/countries", get(countries_handler))
        .route("/entertainment/movies/detail/:slug", get(detail_handler))
        .route("/entertainment/movies/play/:slug", get(play_handler))
        .route("/entertainment/movies/filter", get(catalog_filter_handler))
        // Source controls
        .route("/entertainment/movies/sources", get(sources_handler))
        .route("/entertainment/movies/sources/active", put(pin_source_handler))
        .route("/entertainment/movies/sources/probe", post(probe_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Entertainment API server.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    /// Get shared state for use by other components.
    pub fn state(&self) -> ApiState {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Run the API server until a shutdown signal arrives.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("entertainment API listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.state.shutdown.clone()))
            .await?;

        tracing::info!("entertainment API stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_source: state.catalog.active_source().name,
        cache_entries: state.catalog.cache_len() + state.relay.cache_len(),
    };
    Json(response)
}

async fn proxy_handler(State(state): State<ApiState>, Query(query): Query<ProxyQuery>) -> Response {
    let Some(url) = query.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL parameter is required" })),
        )
            .into_response();
    };

    match state.relay.proxy(&url).await {
        Ok(body) => Json(body).into_response(),
        Err(RelayError::InvalidUrl(details)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid URL parameter", "details": details })),
        )
            .into_response(),
        Err(RelayError::Status(code)) => {
            tracing::warn!("proxy upstream returned {} for {}", code, url);
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(json!({ "error": "External API Error" }))).into_response()
        }
        Err(e) => {
            tracing::warn!("proxy failed for {}: {}", url, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Failed to connect to external API",
                    "details": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

async fn movie_filter_handler(
    State(state): State<ApiState>,
    Query(query): Query<MovieFilterQuery>,
) -> Response {
    match state.relay.movie_filter(&query).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!("movie filter failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Failed to perform search/filter",
                    "details": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

async fn comic_categories_handler(State(state): State<ApiState>) -> Response {
    match state.relay.comic_categories().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn comic_filter_handler(
    State(state): State<ApiState>,
    Query(query): Query<ComicFilterQuery>,
) -> Response {
    match state.relay.comic_filter(&query).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn home_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.get_home(&cancel).await)
}

async fn list_handler(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    let page = query.page.unwrap_or(1);
    Json(state.catalog.get_list_by_slug(&slug, page, &cancel).await)
}

async fn search_handler(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    let keyword = query.keyword.unwrap_or_default();
    let page = query.page.unwrap_or(1);
    Json(state.catalog.search(&keyword, page, &cancel).await)
}

async fn categories_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.get_categories(&cancel).await)
}

async fn countries_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.get_countries(&cancel).await)
}

async fn detail_handler(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.get_movie_detail(&slug, &cancel).await)
}

async fn play_handler(State(state): State<ApiState>, Path(slug): Path<String>) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.get_playback(&slug, &cancel).await)
}

async fn catalog_filter_handler(
    State(state): State<ApiState>,
    Query(params): Query<MovieFilterParams>,
) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    Json(state.catalog.filter(&params, &cancel).await)
}

async fn sources_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.sources())
}

async fn pin_source_handler(
    State(state): State<ApiState>,
    Json(req): Json<PinRequest>,
) -> Response {
    match state.catalog.pin_source(&req.name) {
        Ok(_) => (StatusCode::OK, Json(state.sources())).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn probe_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let cancel = state.shutdown.request_token();
    let response = match state.catalog.probe(&cancel).await {
        Ok(source) => {
            let name = source.name.clone();
            CatalogResponse::ok(source, name)
        }
        Err(e) => CatalogResponse::failure(e.to_string(), state.catalog.active_source().name),
    };
    Json(response)
}
