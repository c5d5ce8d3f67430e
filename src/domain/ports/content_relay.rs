//! Content Relay Port
//!
//! Defines the interface for fetching upstream JSON.
//! Implementations may call the provider directly or go through the
//! backend's `/entertainment/proxy` endpoint.

use crate::domain::errors::RelayError;
use async_trait::async_trait;
use serde_json::Value;

/// Outbound relay: fetch a URL, return its JSON body or a classified failure.
///
/// Non-2xx responses must be reported as `RelayError::Status`, bodies that
/// are not JSON as `RelayError::Decode`.
#[async_trait]
pub trait ContentRelay: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, RelayError>;
}
