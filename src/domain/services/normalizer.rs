//! Response Normalizer
//!
//! Maps each dialect's raw JSON into the canonical catalog shapes.
//! Dispatch is an exhaustive match on [`Dialect`]; payload shapes are never
//! sniffed to decide which provider family produced them. Missing or
//! mistyped optional fields fall back to empty values.

use crate::domain::entities::{
    EpisodeItem, EpisodeServer, MovieDetail, MovieList, MovieSummary, Pagination, Term,
};
use crate::domain::value_objects::Dialect;
use serde_json::Value;

/// Substituted when an item has no image at all.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x450?text=No+Image";

/// Normalize a movie detail payload.
///
/// Returns `None` only when the payload carries no movie object at all,
/// which callers treat as an unusable response.
pub fn normalize_detail(raw: &Value, dialect: Dialect) -> Option<MovieDetail> {
    match dialect {
        Dialect::OPhim => ophim_detail(raw),
        Dialect::NguonC => nguonc_detail(raw),
    }
}

/// Normalize a paginated movie listing.
pub fn normalize_list(raw: &Value, dialect: Dialect) -> MovieList {
    if raw.is_null() {
        return MovieList::default();
    }

    let (items, pagination) = match dialect {
        Dialect::OPhim => {
            let data = ophim_data(raw);
            let pagination = data
                .pointer("/params/pagination")
                .or_else(|| raw.get("pagination"))
                .unwrap_or(&Value::Null);
            (array_at(data, "items"), pagination)
        }
        Dialect::NguonC => (
            array_at(raw, "items"),
            raw.get("pagination").unwrap_or(&Value::Null),
        ),
    };

    let items: Vec<MovieSummary> = items.iter().map(|item| summary(item, dialect)).collect();
    let pagination = read_pagination(pagination, items.len());

    MovieList { items, pagination }
}

/// Normalize a taxonomy listing (categories, countries).
pub fn normalize_terms(raw: &Value, dialect: Dialect) -> Vec<Term> {
    let rows = match dialect {
        Dialect::OPhim => array_at(ophim_data(raw), "items"),
        Dialect::NguonC => array_at(raw, "items"),
    };
    rows.iter().filter_map(term).collect()
}

/// `ceil(total_items / per_page)` unless the upstream already says,
/// and never less than one page.
pub fn total_pages(explicit: Option<u64>, total_items: Option<u64>, per_page: Option<u64>) -> u64 {
    if let Some(pages) = explicit.filter(|p| *p > 0) {
        return pages;
    }
    match (total_items, per_page) {
        (Some(total), Some(per)) if total > 0 && per > 0 => total.div_ceil(per),
        _ => 1,
    }
}

/// Resolve an image reference against the dialect's CDN.
///
/// Absolute URLs pass through, relative paths are joined with the CDN,
/// absent values become [`PLACEHOLDER_IMAGE`].
pub fn resolve_image_url(url: Option<&str>, dialect: Dialect) -> String {
    let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => u,
        None => return PLACEHOLDER_IMAGE.to_string(),
    };
    if url.starts_with("http") {
        return url.to_string();
    }

    let relative = url.trim_start_matches('/');
    let relative = match dialect {
        Dialect::OPhim => relative.strip_prefix("uploads/movies/").unwrap_or(relative),
        Dialect::NguonC => relative,
    };
    format!("{}{}", dialect.image_cdn(), relative)
}

fn ophim_detail(raw: &Value) -> Option<MovieDetail> {
    let movie = raw
        .pointer("/data/item")
        .filter(|v| v.is_object())
        .or_else(|| raw.get("movie").filter(|v| v.is_object()))?;

    let servers = movie
        .get("episodes")
        .filter(|v| v.is_array())
        .or_else(|| raw.get("episodes"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let episodes = servers
        .iter()
        .map(|server| EpisodeServer {
            server_name: text(server, "server_name"),
            items: array_at(server, "server_data")
                .iter()
                .map(|ep| EpisodeItem {
                    name: text(ep, "name"),
                    slug: text(ep, "slug"),
                    embed_url: text(ep, "link_embed"),
                    stream_url: text(ep, "link_m3u8"),
                })
                .collect(),
        })
        .collect();

    Some(MovieDetail {
        summary: summary(movie, Dialect::OPhim),
        description: text(movie, "content"),
        time: text(movie, "time"),
        lang: text(movie, "lang"),
        quality: text(movie, "quality"),
        director: string_list(movie.get("director")),
        actor: string_list(movie.get("actor")),
        country: array_at(movie, "country").iter().filter_map(term).collect(),
        category: array_at(movie, "category").iter().filter_map(term).collect(),
        episodes,
        source: String::new(),
    })
}

fn nguonc_detail(raw: &Value) -> Option<MovieDetail> {
    let movie = raw.get("movie").filter(|v| v.is_object())?;

    let servers = raw
        .get("episodes")
        .filter(|v| v.is_array())
        .or_else(|| movie.get("episodes"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let episodes = servers
        .iter()
        .map(|server| EpisodeServer {
            server_name: text(server, "server_name"),
            items: array_at(server, "items")
                .iter()
                .map(|ep| EpisodeItem {
                    name: text(ep, "name"),
                    slug: text(ep, "slug"),
                    embed_url: text(ep, "embed"),
                    stream_url: text(ep, "m3u8"),
                })
                .collect(),
        })
        .collect();

    let director = text(movie, "director");
    let quality = text(movie, "quality");

    Some(MovieDetail {
        summary: summary(movie, Dialect::NguonC),
        description: text(movie, "description"),
        time: text(movie, "time"),
        lang: text(movie, "language"),
        quality: if quality.is_empty() {
            "HD".to_string()
        } else {
            quality
        },
        director: if director.is_empty() {
            Vec::new()
        } else {
            vec![director]
        },
        actor: split_names(&text(movie, "casts")),
        country: split_names(&text(movie, "country"))
            .into_iter()
            .map(named_term)
            .collect(),
        category: split_names(&text(movie, "category"))
            .into_iter()
            .map(named_term)
            .collect(),
        episodes,
        source: String::new(),
    })
}

fn summary(item: &Value, dialect: Dialect) -> MovieSummary {
    let id = match dialect {
        Dialect::OPhim => {
            let id = text(item, "_id");
            if id.is_empty() {
                text(item, "id")
            } else {
                id
            }
        }
        Dialect::NguonC => text(item, "id"),
    };

    MovieSummary {
        id,
        name: text(item, "name"),
        original_name: text(item, "origin_name"),
        slug: text(item, "slug"),
        thumbnail_url: resolve_image_url(item.get("thumb_url").and_then(Value::as_str), dialect),
        poster_url: resolve_image_url(item.get("poster_url").and_then(Value::as_str), dialect),
        year: number(item, "year").and_then(|y| u32::try_from(y).ok()),
        kind: text(item, "type"),
    }
}

fn read_pagination(pagination: &Value, item_count: usize) -> Pagination {
    let total_items = number(pagination, "totalItems");
    let per_page = number(pagination, "totalItemsPerPage").filter(|p| *p > 0);

    Pagination {
        page: number(pagination, "currentPage").filter(|p| *p > 0).unwrap_or(1),
        total_pages: total_pages(number(pagination, "totalPages"), total_items, per_page),
        total_items: total_items.unwrap_or(0),
        items_per_page: per_page.unwrap_or(item_count as u64),
    }
}

/// OPhim nests payloads under `data`; older mirrors return them bare.
fn ophim_data(raw: &Value) -> &Value {
    raw.get("data").filter(|d| !d.is_null()).unwrap_or(raw)
}

/// Array stored under `key`, or the value itself when it already is one.
fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .or_else(|| value.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Unsigned number stored as a JSON number or numeric string.
fn number(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn split_names(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn term(value: &Value) -> Option<Term> {
    if !value.is_object() {
        return None;
    }
    let id = text(value, "_id");
    Some(Term {
        id: if id.is_empty() { text(value, "id") } else { id },
        name: text(value, "name"),
        slug: text(value, "slug"),
    })
}

fn named_term(name: String) -> Term {
    Term {
        name,
        ..Default::default()
    }
}
