//! Value Objects - Immutable domain primitives
//!
//! Dialects, cache tiers and the logical catalog operations. The per-dialect
//! path mapping lives here as a static table so URL building never has to
//! guess from payload shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response shape convention used by a family of upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// OPhim family (ophim1, ophim17, kkphim): payloads nested under `data`.
    OPhim,
    /// NguonC: top-level `movie` / `items` keys.
    NguonC,
}

impl Dialect {
    /// Parse a dialect tag. Accepts the provider family name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ophim" | "kkphim" => Some(Self::OPhim),
            "nguonc" => Some(Self::NguonC),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OPhim => "ophim",
            Self::NguonC => "nguonc",
        }
    }

    /// Path prefix every endpoint of this dialect lives under.
    pub fn api_prefix(&self) -> &'static str {
        match self {
            Self::OPhim => "/v1/api",
            Self::NguonC => "/api",
        }
    }

    /// Lightweight endpoint used to check that a source is alive.
    pub fn probe_path(&self) -> &'static str {
        match self {
            Self::OPhim => "/the-loai",
            Self::NguonC => "/films/the-loai/hanh-dong",
        }
    }

    /// CDN that relative image paths are resolved against.
    pub fn image_cdn(&self) -> &'static str {
        match self {
            Self::OPhim => "https://img.ophim.live/uploads/movies/",
            Self::NguonC => "https://phim.nguonc.com/",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness tier for cached catalog results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Volatile listings such as the home feed.
    Short,
    /// Taxonomies and category/country listings.
    Medium,
}

/// Canonical result kind an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    List,
    Detail,
    Terms,
}

/// A logical catalog operation, independent of which source serves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Home,
    ListBySlug { slug: String, page: u32 },
    Search { keyword: String, page: u32 },
    Categories,
    Countries,
    Detail { slug: String },
    Genre { slug: String, page: u32 },
    Country { slug: String, page: u32 },
    Year { year: String, page: u32 },
}

impl Operation {
    /// Dialect-specific path below the dialect's API prefix.
    pub fn path(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (Self::Home, Dialect::OPhim) => "/home".to_string(),
            (Self::Home, Dialect::NguonC) => "/films/phim-moi-cap-nhat".to_string(),
            (Self::ListBySlug { slug, .. }, Dialect::OPhim) => format!("/danh-sach/{}", slug),
            (Self::ListBySlug { slug, .. }, Dialect::NguonC) => {
                format!("/films/danh-sach/{}", slug)
            }
            (Self::Search { .. }, Dialect::OPhim) => "/tim-kiem".to_string(),
            (Self::Search { .. }, Dialect::NguonC) => "/films/search".to_string(),
            (Self::Categories, _) => "/the-loai".to_string(),
            (Self::Countries, _) => "/quoc-gia".to_string(),
            (Self::Detail { slug }, Dialect::OPhim) => format!("/phim/{}", slug),
            (Self::Detail { slug }, Dialect::NguonC) => format!("/film/{}", slug),
            (Self::Genre { slug, .. }, Dialect::OPhim) => format!("/the-loai/{}", slug),
            (Self::Genre { slug, .. }, Dialect::NguonC) => format!("/films/the-loai/{}", slug),
            (Self::Country { slug, .. }, Dialect::OPhim) => format!("/quoc-gia/{}", slug),
            (Self::Country { slug, .. }, Dialect::NguonC) => format!("/films/quoc-gia/{}", slug),
            (Self::Year { year, .. }, Dialect::OPhim) => format!("/nam-phat-hanh/{}", year),
            (Self::Year { year, .. }, Dialect::NguonC) => {
                format!("/films/nam-phat-hanh/{}", year)
            }
        }
    }

    /// Query parameters, in order. NguonC search does not paginate.
    pub fn params(&self, dialect: Dialect) -> Vec<(&'static str, String)> {
        match self {
            Self::Home | Self::Categories | Self::Countries | Self::Detail { .. } => Vec::new(),
            Self::Search { keyword, page } => match dialect {
                Dialect::OPhim => vec![("keyword", keyword.clone()), ("page", page.to_string())],
                Dialect::NguonC => vec![("keyword", keyword.clone())],
            },
            Self::ListBySlug { page, .. }
            | Self::Genre { page, .. }
            | Self::Country { page, .. }
            | Self::Year { page, .. } => vec![("page", page.to_string())],
        }
    }

    /// Cache tier, or `None` for operations that always go live.
    pub fn cache_tier(&self) -> Option<CacheTier> {
        match self {
            Self::Home => Some(CacheTier::Short),
            Self::Search { .. } | Self::Detail { .. } => None,
            Self::ListBySlug { .. }
            | Self::Categories
            | Self::Countries
            | Self::Genre { .. }
            | Self::Country { .. }
            | Self::Year { .. } => Some(CacheTier::Medium),
        }
    }

    pub fn result_kind(&self) -> ResultKind {
        match self {
            Self::Detail { .. } => ResultKind::Detail,
            Self::Categories | Self::Countries => ResultKind::Terms,
            _ => ResultKind::List,
        }
    }

    /// Path segment taken from the caller, if this operation has one.
    pub fn path_argument(&self) -> Option<&str> {
        match self {
            Self::ListBySlug { slug, .. }
            | Self::Detail { slug }
            | Self::Genre { slug, .. }
            | Self::Country { slug, .. } => Some(slug),
            Self::Year { year, .. } => Some(year),
            Self::Home | Self::Search { .. } | Self::Categories | Self::Countries => None,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::ListBySlug { .. } => "list",
            Self::Search { .. } => "search",
            Self::Categories => "categories",
            Self::Countries => "countries",
            Self::Detail { .. } => "detail",
            Self::Genre { .. } => "genre",
            Self::Country { .. } => "country",
            Self::Year { .. } => "year",
        }
    }
}
