use crate::domain::entities::Source;
use crate::domain::value_objects::Dialect;
use anyhow::{anyhow, bail};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server settings
    pub listen_addr: String,
    pub debug: bool,

    // Catalog settings
    pub sources: Vec<Source>,
    pub backend_url: Option<String>,
    pub upstream_timeout_secs: u64,
    pub ttl_short_secs: u64,
    pub ttl_medium_secs: u64,

    // Cache settings
    pub proxy_cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub cache_sweep_secs: u64,

    // Relay upstreams
    pub movie_filter_upstream: String,
    pub comic_api: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            debug: false,
            sources: Source::defaults(),
            backend_url: None,
            upstream_timeout_secs: 8,
            ttl_short_secs: 300,
            ttl_medium_secs: 900,
            proxy_cache_ttl_secs: 600,
            cache_max_entries: 1000,
            cache_sweep_secs: 60,
            movie_filter_upstream: "https://ophim1.com/v1/api".to_string(),
            comic_api: "https://otruyenapi.com/v1/api".to_string(),
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Build the config from an arbitrary variable lookup.
pub fn load_config_with<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();
    let number = |key: &str, default: u64| -> u64 {
        lookup(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    };

    let listen_addr = lookup("HOUSEMARKET_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let debug = lookup("DEBUG").is_some();

    let sources = match lookup("HOUSEMARKET_SOURCES") {
        Some(raw) if !raw.trim().is_empty() => parse_sources(&raw)?,
        _ => defaults.sources,
    };

    let backend_url = lookup("HOUSEMARKET_BACKEND_URL").filter(|v| !v.trim().is_empty());

    let upstream_timeout_secs = number(
        "HOUSEMARKET_UPSTREAM_TIMEOUT_SECS",
        defaults.upstream_timeout_secs,
    );
    let ttl_short_secs = number("HOUSEMARKET_TTL_SHORT_SECS", defaults.ttl_short_secs);
    let ttl_medium_secs = number("HOUSEMARKET_TTL_MEDIUM_SECS", defaults.ttl_medium_secs);

    let proxy_cache_ttl_secs = number(
        "HOUSEMARKET_PROXY_CACHE_TTL_SECS",
        defaults.proxy_cache_ttl_secs,
    );
    let cache_max_entries = number(
        "HOUSEMARKET_CACHE_MAX_ENTRIES",
        defaults.cache_max_entries as u64,
    ) as usize;
    let cache_sweep_secs = number("HOUSEMARKET_CACHE_SWEEP_SECS", defaults.cache_sweep_secs);

    let movie_filter_upstream =
        lookup("HOUSEMARKET_MOVIE_FILTER_UPSTREAM").unwrap_or(defaults.movie_filter_upstream);

    let comic_api = lookup("HOUSEMARKET_COMIC_API").unwrap_or(defaults.comic_api);

    Ok(Config {
        listen_addr,
        debug,
        sources,
        backend_url,
        upstream_timeout_secs,
        ttl_short_secs,
        ttl_medium_secs,
        proxy_cache_ttl_secs,
        cache_max_entries,
        cache_sweep_secs,
        movie_filter_upstream,
        comic_api,
    })
}

/// Parse `name|url|dialect;name|url|dialect`.
pub fn parse_sources(raw: &str) -> anyhow::Result<Vec<Source>> {
    let mut sources = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
        let [name, url, dialect] = parts.as_slice() else {
            bail!("source entry must be name|url|dialect: {}", entry);
        };
        if name.is_empty() || url.is_empty() {
            bail!("source entry has an empty field: {}", entry);
        }
        let dialect =
            Dialect::parse(dialect).ok_or_else(|| anyhow!("unknown dialect in {}", entry))?;
        sources.push(Source::new(*name, *url, dialect));
    }
    if sources.is_empty() {
        bail!("HOUSEMARKET_SOURCES is set but lists no sources");
    }
    Ok(sources)
}
