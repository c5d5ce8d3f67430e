//! HouseMarket entertainment catalog
//!
//! This module exposes the catalog components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{MovieCatalog, RelayService, SourceRegistry, SourceState};
pub use config::load_config;
pub use domain::entities::{CatalogResponse, MovieDetail, MovieList, Source};
pub use domain::errors::{CatalogError, RelayError};
pub use domain::ports::{ContentRelay, ResponseCache};
pub use domain::value_objects::{Dialect, Operation};
