mod backend_proxy_relay;
mod dashmap_response_cache;
mod http_relay;

pub use backend_proxy_relay::{catalog_relay, BackendProxyRelay};
pub use dashmap_response_cache::{DashMapResponseCache, DEFAULT_MAX_ENTRIES};
pub use http_relay::{parse_http_url, HttpRelay, ACCEPT_JSON, BROWSER_USER_AGENT, DEFAULT_TIMEOUT};
