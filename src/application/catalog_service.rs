//! Movie Catalog - Failover request executor
//!
//! The public entry point for catalog reads. Each logical operation is
//! resolved against the active source, served from cache when possible,
//! and retried exactly once on the next source when the first attempt
//! fails.

use crate::application::source_registry::{SourceRegistry, SourceState};
use crate::domain::entities::{
    CatalogPayload, CatalogResponse, EpisodeItem, Fetched, MovieDetail, MovieList, Source, Term,
};
use crate::domain::errors::{CatalogError, RelayError};
use crate::domain::ports::{ContentRelay, ResponseCache};
use crate::domain::services::filter_planner::sanitize_slug;
use crate::domain::services::normalizer::{normalize_detail, normalize_list, normalize_terms};
use crate::domain::services::server_selector::initial_episode;
use crate::domain::value_objects::{CacheTier, Dialect, Operation, ResultKind};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source label for results served by the backend filter endpoint.
pub const PROXY_FILTER_SOURCE: &str = "proxy-filter";

/// Backend path used for combined OPhim filters.
pub const BACKEND_FILTER_PATH: &str = "/entertainment/filter";

/// Cache lifetimes for the two freshness tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTtls {
    pub short: Duration,
    pub medium: Duration,
}

impl Default for CatalogTtls {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(300),
            medium: Duration::from_secs(900),
        }
    }
}

impl CatalogTtls {
    pub fn for_tier(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Short => self.short,
            CacheTier::Medium => self.medium,
        }
    }
}

/// Filter criteria. `category` is accepted as an alias of `genre`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MovieFilterParams {
    #[serde(alias = "category")]
    pub genre: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<u32>,
}

impl MovieFilterParams {
    fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    /// Single upstream listing for this filter: genre, then country,
    /// then year, then type, else the home feed.
    pub fn primary_operation(&self) -> Operation {
        let page = self.page();
        if let Some(genre) = present(&self.genre) {
            Operation::Genre {
                slug: sanitize_slug(genre),
                page,
            }
        } else if let Some(country) = present(&self.country) {
            Operation::Country {
                slug: sanitize_slug(country),
                page,
            }
        } else if let Some(year) = present(&self.year) {
            Operation::Year {
                year: sanitize_slug(year),
                page,
            }
        } else if let Some(kind) = present(&self.kind) {
            Operation::ListBySlug {
                slug: list_slug_for_kind(kind),
                page,
            }
        } else {
            Operation::Home
        }
    }

    /// Year still to apply after the primary listing was fetched.
    fn secondary_year(&self) -> Option<u32> {
        if present(&self.genre).is_none() && present(&self.country).is_none() {
            return None;
        }
        present(&self.year).and_then(|y| y.parse().ok())
    }

    fn backend_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        for (key, value) in [
            ("type", &self.kind),
            ("genre", &self.genre),
            ("country", &self.country),
            ("year", &self.year),
        ] {
            if let Some(v) = present(value) {
                query.push((key, v.to_string()));
            }
        }
        query.push(("page", self.page().to_string()));
        query
    }
}

/// A movie with its auto-selected starting episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    pub server_name: String,
    pub episode: EpisodeItem,
    pub detail: MovieDetail,
}

/// Combined filters on OPhim sources go through the application backend.
struct BackendFilter {
    base_url: String,
    relay: Arc<dyn ContentRelay>,
}

/// Failover catalog over a [`SourceRegistry`].
pub struct MovieCatalog {
    registry: Arc<SourceRegistry>,
    relay: Arc<dyn ContentRelay>,
    cache: Arc<dyn ResponseCache<CatalogPayload>>,
    ttls: CatalogTtls,
    backend_filter: Option<BackendFilter>,
}

impl MovieCatalog {
    pub fn new(
        registry: Arc<SourceRegistry>,
        relay: Arc<dyn ContentRelay>,
        cache: Arc<dyn ResponseCache<CatalogPayload>>,
        ttls: CatalogTtls,
    ) -> Self {
        Self {
            registry,
            relay,
            cache,
            ttls,
            backend_filter: None,
        }
    }

    /// Route OPhim filters through `{base_url}/entertainment/filter`.
    pub fn with_backend_filter(
        mut self,
        base_url: impl Into<String>,
        relay: Arc<dyn ContentRelay>,
    ) -> Self {
        self.backend_filter = Some(BackendFilter {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            relay,
        });
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn sources(&self) -> &[Source] {
        self.registry.list_sources()
    }

    pub fn active_source(&self) -> Source {
        self.registry.active()
    }

    pub fn state(&self) -> SourceState {
        self.registry.state()
    }

    pub fn set_active_by_name(&self, name: &str) -> bool {
        self.registry.set_active_by_name(name)
    }

    /// Pin `name` as the active source.
    pub fn pin_source(&self, name: &str) -> Result<Source, CatalogError> {
        if self.registry.set_active_by_name(name) {
            Ok(self.registry.active())
        } else {
            Err(CatalogError::UnknownSource(name.to_string()))
        }
    }

    /// Re-run source selection from index 0.
    pub async fn probe(&self, cancel: &CancellationToken) -> Result<Source, CatalogError> {
        self.registry
            .probe_and_stabilize(self.relay.as_ref(), cancel)
            .await
    }

    /// Run `op` with cache lookup, failover and a single retry.
    pub async fn execute(
        &self,
        op: &Operation,
        cancel: &CancellationToken,
    ) -> Result<Fetched<CatalogPayload>, CatalogError> {
        if cancel.is_cancelled() {
            return Err(CatalogError::Aborted);
        }
        if op.path_argument().is_some_and(str::is_empty) {
            return Err(CatalogError::InvalidRequest(format!(
                "{} needs a non-empty slug",
                op.name()
            )));
        }
        self.ensure_ready(cancel).await?;

        let first = self.registry.active();
        let first_error = match self.attempt(op, &first, cancel).await {
            Ok(fetched) => {
                self.registry.mark_stable();
                return Ok(fetched);
            }
            Err(e) if e.is_aborted() => return Err(CatalogError::Aborted),
            Err(e) if !e.triggers_rotation() => return Err(e),
            Err(e) => e,
        };

        tracing::warn!(
            "{} failed on {}: {}, retrying on next source",
            op.name(),
            first.name,
            first_error
        );
        let next = self.registry.rotate_to_next();

        match self.attempt(op, &next, cancel).await {
            Ok(fetched) => {
                self.registry.mark_stable();
                Ok(fetched)
            }
            Err(e) if e.is_aborted() => Err(CatalogError::Aborted),
            Err(e) => {
                tracing::error!("{} failed on {} after retry: {}", op.name(), next.name, e);
                Err(CatalogError::Exhausted {
                    attempts: 2,
                    last: e.to_string(),
                })
            }
        }
    }

    /// Probe once at startup unless a source was pinned or a probe already ran.
    async fn ensure_ready(&self, cancel: &CancellationToken) -> Result<(), CatalogError> {
        if self.registry.is_pinned() || self.registry.state() != SourceState::Unprobed {
            return Ok(());
        }
        if !self.registry.begin_stabilizing() {
            return Ok(());
        }

        match self.probe(cancel).await {
            Ok(_) => Ok(()),
            Err(CatalogError::Aborted) => Err(CatalogError::Aborted),
            Err(e) => {
                // Proceed against index 0; the operation result reports the outcome.
                tracing::warn!("startup probe failed: {}", e);
                Ok(())
            }
        }
    }

    async fn attempt(
        &self,
        op: &Operation,
        source: &Source,
        cancel: &CancellationToken,
    ) -> Result<Fetched<CatalogPayload>, CatalogError> {
        let url = build_target_url(source, op)?;
        let tier = op.cache_tier();

        if tier.is_some() {
            if let Some(payload) = self.cache.get(&url) {
                tracing::debug!("cache hit: {}", url);
                return Ok(Fetched {
                    data: payload,
                    source: source.name.clone(),
                    cached: true,
                });
            }
            tracing::debug!("cache miss: {}", url);
        }

        let raw = self.fetch(self.relay.as_ref(), &url, cancel).await?;
        check_status(&raw, source)?;
        let payload = normalize(op.result_kind(), &raw, source)?;

        if let Some(tier) = tier {
            self.cache
                .insert(url, payload.clone(), self.ttls.for_tier(tier));
        }

        Ok(Fetched {
            data: payload,
            source: source.name.clone(),
            cached: false,
        })
    }

    async fn fetch(
        &self,
        relay: &dyn ContentRelay,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, CatalogError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CatalogError::Aborted),
            result = relay.get_json(url) => result.map_err(CatalogError::from),
        }
    }

    async fn execute_typed<T>(
        &self,
        op: Operation,
        cancel: &CancellationToken,
        extract: fn(CatalogPayload) -> Option<T>,
    ) -> Result<Fetched<T>, CatalogError> {
        let fetched = self.execute(&op, cancel).await?;
        let data = extract(fetched.data).ok_or_else(|| CatalogError::Malformed {
            source_name: fetched.source.clone(),
            reason: format!("unexpected result kind for {}", op.name()),
        })?;
        Ok(Fetched {
            data,
            source: fetched.source,
            cached: fetched.cached,
        })
    }

    fn respond<T>(&self, result: Result<Fetched<T>, CatalogError>) -> CatalogResponse<T> {
        CatalogResponse::from_result(result, &self.registry.active().name)
    }

    // ===== Typed operations =====

    pub async fn fetch_list(
        &self,
        op: Operation,
        cancel: &CancellationToken,
    ) -> Result<Fetched<MovieList>, CatalogError> {
        self.execute_typed(op, cancel, CatalogPayload::into_list).await
    }

    pub async fn get_home(&self, cancel: &CancellationToken) -> CatalogResponse<MovieList> {
        self.respond(self.fetch_list(Operation::Home, cancel).await)
    }

    pub async fn get_list_by_slug(
        &self,
        slug: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> CatalogResponse<MovieList> {
        let op = Operation::ListBySlug {
            slug: sanitize_slug(slug),
            page: page.max(1),
        };
        self.respond(self.fetch_list(op, cancel).await)
    }

    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> CatalogResponse<MovieList> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return CatalogResponse::ok(MovieList::default(), self.registry.active().name);
        }
        let op = Operation::Search {
            keyword: keyword.to_string(),
            page: page.max(1),
        };
        self.respond(self.fetch_list(op, cancel).await)
    }

    pub async fn get_categories(&self, cancel: &CancellationToken) -> CatalogResponse<Vec<Term>> {
        let result = self
            .execute_typed(Operation::Categories, cancel, CatalogPayload::into_terms)
            .await;
        self.respond(result)
    }

    pub async fn get_countries(&self, cancel: &CancellationToken) -> CatalogResponse<Vec<Term>> {
        let result = self
            .execute_typed(Operation::Countries, cancel, CatalogPayload::into_terms)
            .await;
        self.respond(result)
    }

    pub async fn get_movie_detail(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> CatalogResponse<MovieDetail> {
        let op = Operation::Detail {
            slug: sanitize_slug(slug),
        };
        let result = self
            .execute_typed(op, cancel, CatalogPayload::into_detail)
            .await
            .map(|mut fetched| {
                fetched.data.source = fetched.source.clone();
                fetched
            });
        self.respond(result)
    }

    /// Detail plus the server and episode a player should open first.
    pub async fn get_playback(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> CatalogResponse<Playback> {
        let detail = self.get_movie_detail(slug, cancel).await;
        let Some(detail) = detail.data else {
            return CatalogResponse {
                success: false,
                data: None,
                error: detail.error,
                source: detail.source,
            };
        };

        let source = detail.source.clone();
        match initial_episode(&detail) {
            Some((server, episode)) => {
                let playback = Playback {
                    server_name: server.server_name.clone(),
                    episode: episode.clone(),
                    detail,
                };
                CatalogResponse::ok(playback, source)
            }
            None => CatalogResponse::failure(format!("no playable episode for {}", slug), source),
        }
    }

    /// Filter movies by genre, country, year and type.
    ///
    /// With a backend configured and an OPhim source active, the combined
    /// filter runs on the backend. Otherwise the highest-priority facet is
    /// fetched through the failover path and the year is applied in memory.
    pub async fn filter(
        &self,
        params: &MovieFilterParams,
        cancel: &CancellationToken,
    ) -> CatalogResponse<MovieList> {
        let active = self.registry.active();
        if let (Dialect::OPhim, Some(backend)) = (active.dialect, &self.backend_filter) {
            return match self.filter_via_backend(backend, params, cancel).await {
                Ok(list) => CatalogResponse::ok(list, PROXY_FILTER_SOURCE),
                Err(e) => CatalogResponse::failure(e.to_string(), PROXY_FILTER_SOURCE),
            };
        }

        let result = self
            .fetch_list(params.primary_operation(), cancel)
            .await
            .map(|mut fetched| {
                if let Some(year) = params.secondary_year() {
                    fetched.data.items.retain(|item| item.year == Some(year));
                }
                fetched
            });
        self.respond(result)
    }

    async fn filter_via_backend(
        &self,
        backend: &BackendFilter,
        params: &MovieFilterParams,
        cancel: &CancellationToken,
    ) -> Result<MovieList, CatalogError> {
        let endpoint = format!("{}{}", backend.base_url, BACKEND_FILTER_PATH);
        let url = Url::parse_with_params(&endpoint, &params.backend_query())
            .map_err(|e| RelayError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let raw = self
            .fetch(backend.relay.as_ref(), url.as_str(), cancel)
            .await?;
        if raw.get("status").and_then(Value::as_str) == Some("error") {
            let message = raw
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("filter failed");
            return Err(CatalogError::Malformed {
                source_name: PROXY_FILTER_SOURCE.to_string(),
                reason: message.to_string(),
            });
        }
        Ok(normalize_list(&raw, Dialect::OPhim))
    }
}

/// `{baseUrl}{dialect prefix}{path}` plus form-encoded parameters.
pub fn build_target_url(source: &Source, op: &Operation) -> Result<String, CatalogError> {
    let base = format!(
        "{}{}{}",
        source.base_url,
        source.dialect.api_prefix(),
        op.path(source.dialect)
    );
    let params = op.params(source.dialect);
    let url = if params.is_empty() {
        Url::parse(&base)
    } else {
        Url::parse_with_params(&base, &params)
    };
    url.map(String::from)
        .map_err(|e| RelayError::InvalidUrl(format!("{}: {}", base, e)).into())
}

/// Reject bodies that explicitly report failure.
fn check_status(raw: &Value, source: &Source) -> Result<(), CatalogError> {
    let failed = match raw.get("status") {
        Some(Value::Bool(ok)) => !ok,
        Some(Value::String(s)) => s != "success",
        _ => false,
    };
    if failed {
        return Err(CatalogError::Malformed {
            source_name: source.name.clone(),
            reason: format!("status {}", raw["status"]),
        });
    }
    Ok(())
}

fn normalize(kind: ResultKind, raw: &Value, source: &Source) -> Result<CatalogPayload, CatalogError> {
    match kind {
        ResultKind::List => Ok(CatalogPayload::List(normalize_list(raw, source.dialect))),
        ResultKind::Terms => Ok(CatalogPayload::Terms(normalize_terms(raw, source.dialect))),
        ResultKind::Detail => normalize_detail(raw, source.dialect)
            .map(|detail| CatalogPayload::Detail(Box::new(detail)))
            .ok_or_else(|| CatalogError::Malformed {
                source_name: source.name.clone(),
                reason: "no movie object in detail payload".to_string(),
            }),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn list_slug_for_kind(kind: &str) -> String {
    match kind {
        "chieu-rap" => "phim-chieu-rap".to_string(),
        other => sanitize_slug(other),
    }
}
