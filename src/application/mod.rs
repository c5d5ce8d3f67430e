pub mod catalog_service;
pub mod relay_service;
pub mod source_registry;

pub use catalog_service::{build_target_url, CatalogTtls, MovieCatalog, MovieFilterParams, Playback};
pub use relay_service::{RelayService, RelayServiceConfig};
pub use source_registry::{SourceRegistry, SourceState};
