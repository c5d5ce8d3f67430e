//! Response Cache Port
//!
//! Defines the interface for the time-boxed cache of upstream results.

use std::time::Duration;

/// Time-boxed store keyed by resolved request URL.
///
/// Expired entries must never be returned; implementations drop them
/// on the lookup that discovers them.
pub trait ResponseCache<V>: Send + Sync {
    /// Get a live entry, removing it if it has expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Store a value that stays valid for `ttl`.
    fn insert(&self, key: String, value: V, ttl: Duration);

    /// Drop a single entry.
    fn invalidate(&self, key: &str);

    /// Drop every entry.
    fn clear(&self);

    /// Remove all expired entries, returning how many were dropped.
    fn sweep_expired(&self) -> usize;

    /// Number of stored entries, expired ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
