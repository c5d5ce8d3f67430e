//! Domain Errors
//!
//! Failure taxonomy for the relay port and the catalog use cases.

use thiserror::Error;

/// Failure reported by an outbound relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("unparseable upstream payload: {0}")]
    Decode(String),
    #[error("request aborted")]
    Aborted,
}

impl RelayError {
    /// Whether this failure should advance the active source.
    pub fn triggers_rotation(&self) -> bool {
        !matches!(self, RelayError::Aborted)
    }
}

/// Failure surfaced by the movie catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("source registry is empty")]
    EmptyRegistry,
    #[error("unknown source: {0}")]
    UnknownSource(String),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("unexpected payload shape from {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },
    #[error("no source answered the health probe")]
    NoHealthySource,
    #[error("all sources failed after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request aborted")]
    Aborted,
}

impl CatalogError {
    /// Whether a failed attempt should advance the active source.
    ///
    /// Bad caller input and cancellation never do.
    pub fn triggers_rotation(&self) -> bool {
        match self {
            CatalogError::Relay(e) => e.triggers_rotation(),
            CatalogError::InvalidRequest(_) | CatalogError::Aborted => false,
            _ => true,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            CatalogError::Aborted | CatalogError::Relay(RelayError::Aborted)
        )
    }
}
