//! Adapters Layer
//!
//! Inbound HTTP API and outbound relays and caches.

pub mod inbound;
pub mod outbound;
