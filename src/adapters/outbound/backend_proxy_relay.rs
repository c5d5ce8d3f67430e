//! Backend Proxy Relay
//!
//! Implements ContentRelay by routing every request through the
//! application backend's `/entertainment/proxy?url=` endpoint, which
//! fetches and caches the upstream on our behalf.

use crate::adapters::outbound::http_relay::{parse_http_url, HttpRelay};
use crate::domain::errors::RelayError;
use crate::domain::ports::ContentRelay;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const PROXY_PATH: &str = "/entertainment/proxy";

pub struct BackendProxyRelay {
    backend_base: String,
    client: reqwest::Client,
}

impl BackendProxyRelay {
    pub fn new(backend_base: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self {
            backend_base: backend_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL of the proxy call that fetches `target`.
    pub fn proxy_url(&self, target: &str) -> Result<Url, RelayError> {
        parse_http_url(target)?;
        let endpoint = format!("{}{}", self.backend_base, PROXY_PATH);
        Url::parse_with_params(&endpoint, &[("url", target)])
            .map_err(|e| RelayError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }
}

#[async_trait]
impl ContentRelay for BackendProxyRelay {
    async fn get_json(&self, url: &str) -> Result<Value, RelayError> {
        let proxy_url = self.proxy_url(url)?;

        let response = self
            .client
            .get(proxy_url)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        // The proxy mirrors the upstream status code.
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RelayError::Decode(e.to_string()))
    }
}

/// Relay for catalog reads: through the backend proxy when a backend is
/// configured, otherwise straight to the provider.
pub fn catalog_relay(
    backend_base: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn ContentRelay>, RelayError> {
    match backend_base {
        Some(base) => {
            tracing::info!("catalog requests go through {}{}", base, PROXY_PATH);
            Ok(Arc::new(BackendProxyRelay::new(base, timeout)?))
        }
        None => Ok(Arc::new(HttpRelay::new(timeout)?)),
    }
}
