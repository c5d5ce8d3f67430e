//! Domain Entities - Core catalog objects
//!
//! Upstream sources and the canonical, provider-agnostic shapes every
//! dialect is normalized into. Nothing here performs I/O.

use crate::domain::errors::CatalogError;
use crate::domain::value_objects::Dialect;
use serde::{Deserialize, Serialize};

/// One upstream content provider mirror.
///
/// Sources are immutable once registered; their order in the registry
/// defines failover priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Display name, also used for explicit pinning
    pub name: String,
    /// Origin of the provider API, without trailing slash
    pub base_url: String,
    /// Response shape convention of this provider
    pub dialect: Dialect,
}

impl Source {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dialect,
        }
    }

    /// Sources shipped by default, in failover order.
    pub fn defaults() -> Vec<Source> {
        vec![
            Source::new("OPhim1", "https://ophim1.com", Dialect::OPhim),
            Source::new("OPhim17", "https://ophim17.cc", Dialect::OPhim),
            Source::new("KKPhim", "https://kkphim.vip", Dialect::OPhim),
            Source::new("NguonC", "https://phim.nguonc.com", Dialect::NguonC),
        ]
    }
}

/// Taxonomy row: a category, a country, or one of a movie's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub id: String,
    pub name: String,
    pub original_name: String,
    pub slug: String,
    pub thumbnail_url: String,
    pub poster_url: String,
    pub year: Option<u32>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            total_items: 0,
            items_per_page: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieList {
    pub items: Vec<MovieSummary>,
    pub pagination: Pagination,
}

/// A single playable episode on one server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeItem {
    pub name: String,
    pub slug: String,
    pub embed_url: String,
    pub stream_url: String,
}

/// Mirrored playback endpoints grouped by server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeServer {
    pub server_name: String,
    pub items: Vec<EpisodeItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub description: String,
    pub time: String,
    pub lang: String,
    pub quality: String,
    pub director: Vec<String>,
    pub actor: Vec<String>,
    pub country: Vec<Term>,
    pub category: Vec<Term>,
    pub episodes: Vec<EpisodeServer>,
    /// Name of the source the detail was read from
    pub source: String,
}

/// Any canonical result the catalog can produce or cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogPayload {
    List(MovieList),
    Detail(Box<MovieDetail>),
    Terms(Vec<Term>),
}

impl CatalogPayload {
    pub fn into_list(self) -> Option<MovieList> {
        match self {
            CatalogPayload::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_detail(self) -> Option<MovieDetail> {
        match self {
            CatalogPayload::Detail(detail) => Some(*detail),
            _ => None,
        }
    }

    pub fn into_terms(self) -> Option<Vec<Term>> {
        match self {
            CatalogPayload::Terms(terms) => Some(terms),
            _ => None,
        }
    }
}

/// A successful catalog fetch and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: String,
    /// Served from the response cache without network I/O
    pub cached: bool,
}

/// Caller-facing envelope. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: String,
}

impl<T> CatalogResponse<T> {
    pub fn ok(data: T, source: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: source.into(),
        }
    }

    pub fn failure(error: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            source: source.into(),
        }
    }

    /// Wrap a typed result, naming `fallback_source` when the call failed.
    pub fn from_result(result: Result<Fetched<T>, CatalogError>, fallback_source: &str) -> Self {
        match result {
            Ok(fetched) => Self::ok(fetched.data, fetched.source),
            Err(e) => Self::failure(e.to_string(), fallback_source),
        }
    }
}
