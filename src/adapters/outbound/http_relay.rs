//! HTTP Relay
//!
//! Implements ContentRelay by calling upstream providers directly with reqwest.
//! Requests carry browser-like headers because several mirrors reject
//! obvious non-browser clients.

use crate::domain::errors::RelayError;
use crate::domain::ports::ContentRelay;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Direct upstream relay.
#[derive(Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Parse `raw` and reject anything that is not http(s).
pub fn parse_http_url(raw: &str) -> Result<Url, RelayError> {
    let url = Url::parse(raw).map_err(|e| RelayError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(RelayError::InvalidUrl(format!(
            "unsupported scheme {} in {}",
            scheme, raw
        ))),
    }
}

/// `scheme://host[:port]` of the URL.
fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[async_trait]
impl ContentRelay for HttpRelay {
    async fn get_json(&self, url: &str) -> Result<Value, RelayError> {
        let url = parse_http_url(url)?;
        let referer = origin(&url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, ACCEPT_JSON)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

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
