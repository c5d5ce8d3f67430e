//! Relay Service - Backend proxy use cases
//!
//! Serves the backend's generic proxy plus the movie and comic filter
//! endpoints. Proxy and comic category responses are cached by URL.

use crate::domain::errors::RelayError;
use crate::domain::ports::{ContentRelay, ResponseCache};
use crate::domain::services::filter_planner::{
    apply_movie_filter, comic_filter_response, plan_comic_filter, plan_movie_filter,
    ComicFilterQuery, MovieFilterQuery, UpstreamPlan,
};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Upstream endpoints and cache lifetime for the relay service.
#[derive(Debug, Clone)]
pub struct RelayServiceConfig {
    /// OPhim API base used by the movie filter
    pub movie_filter_upstream: String,
    /// OTruyen API base used by the comic endpoints
    pub comic_api: String,
    /// Lifetime of cached proxy responses
    pub proxy_ttl: Duration,
}

impl Default for RelayServiceConfig {
    fn default() -> Self {
        Self {
            movie_filter_upstream: "https://ophim1.com/v1/api".to_string(),
            comic_api: "https://otruyenapi.com/v1/api".to_string(),
            proxy_ttl: Duration::from_secs(600),
        }
    }
}

pub struct RelayService {
    relay: Arc<dyn ContentRelay>,
    cache: Arc<dyn ResponseCache<Value>>,
    config: RelayServiceConfig,
}

impl RelayService {
    pub fn new(
        relay: Arc<dyn ContentRelay>,
        cache: Arc<dyn ResponseCache<Value>>,
        config: RelayServiceConfig,
    ) -> Self {
        Self {
            relay,
            cache,
            config,
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Fetch any upstream URL, caching successful bodies.
    pub async fn proxy(&self, url: &str) -> Result<Value, RelayError> {
        self.cached_get(url).await
    }

    /// Movie filter: one upstream listing chosen by priority, year applied in memory.
    pub async fn movie_filter(&self, query: &MovieFilterQuery) -> Result<Value, RelayError> {
        let plan = plan_movie_filter(query);
        let url = upstream_url(&self.config.movie_filter_upstream, &plan.upstream)?;
        tracing::info!("movie filter chose {}", url);

        let body = self.relay.get_json(&url).await?;
        if plan.secondary_year.is_some() {
            tracing::debug!("applying secondary year filter");
        }
        Ok(apply_movie_filter(body, &plan))
    }

    pub async fn comic_categories(&self) -> Result<Value, RelayError> {
        let url = format!("{}/the-loai", self.config.comic_api.trim_end_matches('/'));
        self.cached_get(&url).await
    }

    pub async fn comic_filter(&self, query: &ComicFilterQuery) -> Result<Value, RelayError> {
        let plan = plan_comic_filter(query);
        let url = upstream_url(&self.config.comic_api, &plan.upstream)?;
        tracing::info!("comic filter chose {}", url);

        let body = self.relay.get_json(&url).await?;
        Ok(comic_filter_response(body, &plan))
    }

    async fn cached_get(&self, url: &str) -> Result<Value, RelayError> {
        if let Some(body) = self.cache.get(url) {
            tracing::debug!("proxy cache hit: {}", url);
            return Ok(body);
        }

        let body = self.relay.get_json(url).await?;
        self.cache
            .insert(url.to_string(), body.clone(), self.config.proxy_ttl);
        Ok(body)
    }
}

fn upstream_url(base: &str, plan: &UpstreamPlan) -> Result<String, RelayError> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), plan.path);
    Url::parse_with_params(&endpoint, &plan.query)
        .map(String::from)
        .map_err(|e| RelayError::InvalidUrl(format!("{}: {}", endpoint, e)))
}
