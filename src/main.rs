//! HouseMarket entertainment service
//!
//! This is the composition root that wires together all the components.

use housemarket::adapters::inbound::{ApiServer, ApiState};
use housemarket::adapters::outbound::{catalog_relay, DashMapResponseCache, HttpRelay};
use housemarket::application::{
    CatalogTtls, MovieCatalog, RelayService, RelayServiceConfig, SourceRegistry,
};
use housemarket::config::load_config;
use housemarket::domain::entities::CatalogPayload;
use housemarket::domain::ports::ContentRelay;
use housemarket::infrastructure::ShutdownController;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting housemarket listen={} sources={}",
        cfg.listen_addr,
        cfg.sources
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let timeout = Duration::from_secs(cfg.upstream_timeout_secs);
    let relay: Arc<dyn ContentRelay> = Arc::new(HttpRelay::new(timeout)?);
    let catalog_upstream = catalog_relay(cfg.backend_url.as_deref(), timeout)?;

    let sweep_interval = Duration::from_secs(cfg.cache_sweep_secs.max(1));
    let catalog_cache = Arc::new(DashMapResponseCache::<CatalogPayload>::new(
        cfg.cache_max_entries,
    ));
    catalog_cache.start_sweeper(sweep_interval);
    let proxy_cache = Arc::new(DashMapResponseCache::<Value>::new(cfg.cache_max_entries));
    proxy_cache.start_sweeper(sweep_interval);

    // 2. Application services
    let registry = Arc::new(SourceRegistry::new(cfg.sources.clone())?);
    let ttls = CatalogTtls {
        short: Duration::from_secs(cfg.ttl_short_secs),
        medium: Duration::from_secs(cfg.ttl_medium_secs),
    };
    let mut catalog = MovieCatalog::new(registry, catalog_upstream, catalog_cache, ttls);
    if let Some(backend_url) = &cfg.backend_url {
        tracing::info!("movie filters on OPhim sources go through {}", backend_url);
        catalog = catalog.with_backend_filter(backend_url.clone(), relay.clone());
    }

    let relay_service = RelayService::new(
        relay,
        proxy_cache,
        RelayServiceConfig {
            movie_filter_upstream: cfg.movie_filter_upstream.clone(),
            comic_api: cfg.comic_api.clone(),
            proxy_ttl: Duration::from_secs(cfg.proxy_cache_ttl_secs),
        },
    );

    // 3. Inbound adapter
    let state = ApiState::new(
        Arc::new(catalog),
        Arc::new(relay_service),
        ShutdownController::new(),
    );
    let server = ApiServer::new(cfg.listen_addr.clone(), state);

    server.run().await
}
