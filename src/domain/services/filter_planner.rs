//! Filter planning for the backend relay endpoints.
//!
//! Upstream providers only filter on one facet at a time, so a combined
//! filter request is turned into a single upstream listing (chosen by
//! priority) plus in-memory post filters for the remaining facets.

use crate::domain::services::normalizer::total_pages;
use serde::Deserialize;
use serde_json::{json, Value};

/// Query accepted by `/entertainment/filter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilterQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    pub page: Option<u32>,
}

/// Query accepted by `/entertainment/comics/filter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComicFilterQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// How a filter request maps onto the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamPlan {
    /// Path below the upstream API base
    pub path: String,
    /// Query parameters, `page` always last
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFilterPlan {
    pub upstream: UpstreamPlan,
    /// Year to post-filter on when the year was not the primary facet
    pub secondary_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicFilterPlan {
    pub upstream: UpstreamPlan,
    pub page: u32,
    /// Status to post-filter on when a category listing was chosen
    pub secondary_status: Option<String>,
    /// Every requested category, for the multi-category post filter
    pub categories: Vec<String>,
}

/// Pick the movie listing: genre, then country, then year, then type.
pub fn plan_movie_filter(query: &MovieFilterQuery) -> MovieFilterPlan {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let genre = present(&query.genre);
    let country = present(&query.country);
    let year = present(&query.year);
    let kind = present(&query.kind);

    let path = if let Some(genre) = genre {
        format!("/the-loai/{}", sanitize_slug(genre))
    } else if let Some(country) = country {
        format!("/quoc-gia/{}", sanitize_slug(country))
    } else if let Some(year) = year {
        format!("/nam-phat-hanh/{}", sanitize_slug(year))
    } else if let Some(kind) = kind {
        format!("/danh-sach/{}", movie_list_slug(kind))
    } else {
        "/danh-sach/phim-moi-cap-nhat".to_string()
    };

    let year_is_primary = genre.is_none() && country.is_none() && year.is_some();
    MovieFilterPlan {
        upstream: UpstreamPlan {
            path,
            query: vec![("page".to_string(), page.to_string())],
        },
        secondary_year: year
            .filter(|_| !year_is_primary)
            .map(str::to_string),
    }
}

/// Apply post filters to an upstream movie listing.
///
/// Bodies that are not a successful listing pass through untouched.
pub fn apply_movie_filter(mut body: Value, plan: &MovieFilterPlan) -> Value {
    if !is_success_listing(&body) {
        return body;
    }
    if let Some(year) = &plan.secondary_year {
        if let Some(items) = body.pointer_mut("/data/items").and_then(Value::as_array_mut) {
            items.retain(|item| value_as_text(item.get("year")) == *year);
        }
    }
    body
}

/// Pick the comic listing: search, then first category, then status, then new releases.
pub fn plan_comic_filter(query: &ComicFilterQuery) -> ComicFilterPlan {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let categories: Vec<String> = present(&query.category)
        .map(|c| {
            c.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let status = present(&query.status);

    let mut params = Vec::new();
    let path = if let Some(q) = present(&query.q) {
        params.push(("keyword".to_string(), q.to_string()));
        "/tim-kiem".to_string()
    } else if let Some(first) = categories.first() {
        format!("/the-loai/{}", sanitize_slug(first))
    } else if let Some(status) = status {
        format!("/danh-sach/{}", comic_status_slug(status))
    } else {
        "/danh-sach/truyen-moi".to_string()
    };
    params.push(("page".to_string(), page.to_string()));

    let category_primary = path.starts_with("/the-loai/");
    ComicFilterPlan {
        upstream: UpstreamPlan {
            path,
            query: params,
        },
        page,
        secondary_status: status
            .filter(|_| category_primary)
            .map(str::to_string),
        categories,
    }
}

/// Build the `/entertainment/comics/filter` response from an upstream listing.
///
/// Returns the upstream body unchanged when it is not a successful listing.
pub fn comic_filter_response(body: Value, plan: &ComicFilterPlan) -> Value {
    if !is_success_listing(&body) {
        return body;
    }

    let mut items: Vec<Value> = body
        .pointer("/data/items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if let Some(status) = &plan.secondary_status {
        if status == "ongoing" || status == "completed" {
            items.retain(|item| item.get("status").and_then(Value::as_str) == Some(status));
        }
    }

    if plan.categories.len() > 1 {
        items.retain(|item| {
            let slugs: Vec<&str> = item
                .get("category")
                .and_then(Value::as_array)
                .map(|cats| {
                    cats.iter()
                        .filter_map(|c| c.get("slug").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();
            plan.categories.iter().all(|c| slugs.contains(&c.as_str()))
        });
    }

    let pagination = body
        .pointer("/data/params/pagination")
        .cloned()
        .unwrap_or(Value::Null);
    let total_items = numeric(pagination.get("totalItems"));
    let per_page = numeric(pagination.get("totalItemsPerPage")).or(Some(20));

    json!({
        "success": true,
        "data": items,
        "pagination": {
            "page": numeric(pagination.get("currentPage")).unwrap_or(plan.page as u64),
            "totalPages": total_pages(None, total_items, per_page),
            "totalItems": total_items.unwrap_or(0),
        }
    })
}

fn is_success_listing(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("success")
        && body.get("data").map(|d| !d.is_null()).unwrap_or(false)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Strip anything that cannot appear in an upstream slug.
pub fn sanitize_slug(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn movie_list_slug(kind: &str) -> String {
    match kind {
        "phim-le" | "phim-bo" | "hoat-hinh" | "tv-shows" => kind.to_string(),
        "chieu-rap" => "phim-chieu-rap".to_string(),
        other => sanitize_slug(other),
    }
}

fn comic_status_slug(status: &str) -> &'static str {
    match status {
        "ongoing" => "dang-cap-nhat",
        "completed" => "hoan-thanh",
        "upcoming" => "sap-ra-mat",
        _ => "truyen-moi",
    }
}

fn value_as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn numeric(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn movie_query(genre: Option<&str>, country: Option<&str>, year: Option<&str>) -> MovieFilterQuery {
        MovieFilterQuery {
            genre: genre.map(str::to_string),
            country: country.map(str::to_string),
            year: year.map(str::to_string),
            ..Default::default()
        }
    }

    // ===== Movie Filter Tests =====

    #[test]
    fn test_movie_filter_genre_wins() {
        let plan = plan_movie_filter(&movie_query(Some("hanh-dong"), Some("han-quoc"), Some("2024")));
        assert_eq!(plan.upstream.path, "/the-loai/hanh-dong");
        assert_eq!(plan.secondary_year.as_deref(), Some("2024"));
        assert_eq!(plan.upstream.query, vec![("page".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_movie_filter_year_primary_has_no_post_filter() {
        let plan = plan_movie_filter(&movie_query(None, None, Some("2023")));
        assert_eq!(plan.upstream.path, "/nam-phat-hanh/2023");
        assert!(plan.secondary_year.is_none());
    }

    #[test]
    fn test_movie_filter_type_mapping() {
        let plan = plan_movie_filter(&MovieFilterQuery {
            kind: Some("chieu-rap".into()),
            page: Some(3),
            ..Default::default()
        });
        assert_eq!(plan.upstream.path, "/danh-sach/phim-chieu-rap");
        assert_eq!(plan.upstream.query[0].1, "3");
    }

    #[test]
    fn test_movie_filter_default_listing() {
        let plan = plan_movie_filter(&MovieFilterQuery::default());
        assert_eq!(plan.upstream.path, "/danh-sach/phim-moi-cap-nhat");
    }

    #[test]
    fn test_movie_filter_strips_path_tricks() {
        let plan = plan_movie_filter(&movie_query(Some("../../admin"), None, None));
        assert_eq!(plan.upstream.path, "/the-loai/admin");
    }

    #[test]
    fn test_apply_movie_filter_secondary_year() {
        let plan = plan_movie_filter(&movie_query(Some("hanh-dong"), None, Some("2024")));
        let body = json!({
            "status": "success",
            "data": {"items": [{"slug": "a", "year": 2024}, {"slug": "b", "year": 2020}, {"slug": "c", "year": "2024"}]}
        });
        let out = apply_movie_filter(body, &plan);
        let items = out["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["slug"], "c");
    }

    #[test]
    fn test_apply_movie_filter_passes_through_failures() {
        let plan = plan_movie_filter(&movie_query(None, None, Some("2024")));
        let body = json!({"status": "error", "message": "down"});
        assert_eq!(apply_movie_filter(body.clone(), &plan), body);
    }

    // ===== Comic Filter Tests =====

    #[test]
    fn test_comic_filter_search_wins() {
        let plan = plan_comic_filter(&ComicFilterQuery {
            q: Some("one piece".into()),
            category: Some("action".into()),
            ..Default::default()
        });
        assert_eq!(plan.upstream.path, "/tim-kiem");
        assert_eq!(plan.upstream.query[0], ("keyword".to_string(), "one piece".to_string()));
        assert_eq!(plan.upstream.query[1].0, "page");
    }

    #[test]
    fn test_comic_filter_first_category_and_status_post_filter() {
        let plan = plan_comic_filter(&ComicFilterQuery {
            category: Some("action, comedy".into()),
            status: Some("ongoing".into()),
            ..Default::default()
        });
        assert_eq!(plan.upstream.path, "/the-loai/action");
        assert_eq!(plan.secondary_status.as_deref(), Some("ongoing"));
        assert_eq!(plan.categories, vec!["action", "comedy"]);
    }

    #[test]
    fn test_comic_filter_status_listing() {
        let plan = plan_comic_filter(&ComicFilterQuery {
            status: Some("completed".into()),
            ..Default::default()
        });
        assert_eq!(plan.upstream.path, "/danh-sach/hoan-thanh");
        assert!(plan.secondary_status.is_none());

        let plan = plan_comic_filter(&ComicFilterQuery {
            status: Some("paused".into()),
            ..Default::default()
        });
        assert_eq!(plan.upstream.path, "/danh-sach/truyen-moi");
    }

    #[test]
    fn test_comic_filter_response_filters_and_paginates() {
        let plan = plan_comic_filter(&ComicFilterQuery {
            category: Some("action,comedy".into()),
            status: Some("ongoing".into()),
            page: Some(2),
            ..Default::default()
        });
        let body = json!({
            "status": "success",
            "data": {
                "items": [
                    {"slug": "a", "status": "ongoing", "category": [{"slug": "action"}, {"slug": "comedy"}]},
                    {"slug": "b", "status": "completed", "category": [{"slug": "action"}, {"slug": "comedy"}]},
                    {"slug": "c", "status": "ongoing", "category": [{"slug": "action"}]}
                ],
                "params": {"pagination": {"totalItems": 45, "totalItemsPerPage": 24, "currentPage": 2}}
            }
        });

        let out = comic_filter_response(body, &plan);
        assert_eq!(out["success"], true);
        let items = out["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["slug"], "a");
        assert_eq!(out["pagination"]["page"], 2);
        assert_eq!(out["pagination"]["totalPages"], 2);
        assert_eq!(out["pagination"]["totalItems"], 45);
    }

    #[test]
    fn test_comic_filter_response_empty_listing_is_one_page() {
        let plan = plan_comic_filter(&ComicFilterQuery::default());
        let body = json!({"status": "success", "data": {"items": []}});
        let out = comic_filter_response(body, &plan);
        assert_eq!(out["pagination"]["totalPages"], 1);
        assert_eq!(out["pagination"]["page"], 1);
    }
}
