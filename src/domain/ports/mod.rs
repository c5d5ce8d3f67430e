mod content_relay;
mod response_cache;

pub use content_relay::ContentRelay;
pub use response_cache::ResponseCache;
