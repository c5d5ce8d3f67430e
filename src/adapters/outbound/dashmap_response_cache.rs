//! DashMap Response Cache
//!
//! Implements ResponseCache using DashMap for lock-free concurrent access.

use crate::domain::ports::ResponseCache;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default capacity when none is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// DashMap-backed response cache.
///
/// Bounded by `max_entries`: inserting into a full cache first drops expired
/// entries, then the entry closest to expiry. Expired entries are also
/// removed lazily on lookup and by the optional background sweeper.
pub struct DashMapResponseCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    max_entries: usize,
}

impl<V: Clone + Send + Sync + 'static> DashMapResponseCache<V> {
    /// Create a cache holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Start the background sweeper task.
    ///
    /// Removes expired entries every `interval`, including keys that are
    /// never looked up again.
    pub fn start_sweeper(&self, interval: Duration) {
        let entries = self.entries.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let removed = Self::remove_expired(&entries);
                if removed > 0 {
                    tracing::debug!("cache sweeper removed {} expired entries", removed);
                }
            }
        });
    }

    fn remove_expired(entries: &DashMap<String, CacheEntry<V>>) -> usize {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(entries.len())
    }

    /// Make room for one more entry.
    fn evict_for_insert(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        Self::remove_expired(&self.entries);

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!("cache full, evicted {}", key);
                }
                None => break,
            }
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for DashMapResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl<V: Clone + Send + Sync + 'static> ResponseCache<V> for DashMapResponseCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // Guard dropped above; removing while holding it would deadlock the shard.
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn insert(&self, key: String, value: V, ttl: Duration) {
        if !self.entries.contains_key(&key) {
            self.evict_for_insert();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn sweep_expired(&self) -> usize {
        Self::remove_expired(&self.entries)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
