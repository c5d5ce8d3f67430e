//! Source Registry
//!
//! Holds the ordered list of upstream sources and the active pointer.
//! The pointer is a lock-free hint shared by every request; concurrent
//! failures may advance it more than one step, which only costs an extra
//! retry.

use crate::domain::entities::Source;
use crate::domain::errors::{CatalogError, RelayError};
use crate::domain::ports::ContentRelay;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

const PHASE_UNPROBED: u8 = 0;
const PHASE_STABILIZING: u8 = 1;
const PHASE_STABLE: u8 = 2;

/// Active source selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "lowercase")]
pub enum SourceState {
    /// No successful probe yet
    Unprobed,
    /// A probe is in flight
    Stabilizing,
    /// Last operation against this index succeeded, or it was pinned
    Stable(usize),
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceState::Unprobed => write!(f, "unprobed"),
            SourceState::Stabilizing => write!(f, "stabilizing"),
            SourceState::Stable(i) => write!(f, "stable({})", i),
        }
    }
}

/// Ordered source list plus the shared active pointer.
///
/// One registry is created per catalog and injected into it, so separate
/// catalogs (and tests) never share rotation state.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: Vec<Source>,
    active: AtomicUsize,
    phase: AtomicU8,
    pinned: AtomicBool,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Source>) -> Result<Self, CatalogError> {
        if sources.is_empty() {
            return Err(CatalogError::EmptyRegistry);
        }
        Ok(Self {
            sources,
            active: AtomicUsize::new(0),
            phase: AtomicU8::new(PHASE_UNPROBED),
            pinned: AtomicBool::new(false),
        })
    }

    pub fn list_sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire) % self.sources.len()
    }

    pub fn active(&self) -> Source {
        self.sources[self.active_index()].clone()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SourceState {
        match self.phase.load(Ordering::Acquire) {
            PHASE_UNPROBED => SourceState::Unprobed,
            PHASE_STABILIZING => SourceState::Stabilizing,
            _ => SourceState::Stable(self.active_index()),
        }
    }

    /// Pin the named source. Returns false, changing nothing, if unknown.
    ///
    /// Pinning moves straight to `Stable(named)` and suppresses probing
    /// until the next failure-driven rotation.
    pub fn set_active_by_name(&self, name: &str) -> bool {
        let Some(index) = self.sources.iter().position(|s| s.name == name) else {
            return false;
        };
        self.active.store(index, Ordering::Release);
        self.pinned.store(true, Ordering::Release);
        self.phase.store(PHASE_STABLE, Ordering::Release);
        tracing::info!("source pinned: {} (index {})", name, index);
        true
    }

    /// Advance to `(i + 1) mod n` and return the new active source.
    pub fn rotate_to_next(&self) -> Source {
        let n = self.sources.len();
        let previous = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % n))
            .unwrap_or_else(|i| i);
        self.pinned.store(false, Ordering::Release);

        let next = (previous + 1) % n;
        tracing::warn!(
            "rotating source: {} -> {}",
            self.sources[previous % n].name,
            self.sources[next].name
        );
        self.sources[next].clone()
    }

    /// Record a successful operation against the active source.
    pub fn mark_stable(&self) {
        self.phase.store(PHASE_STABLE, Ordering::Release);
    }

    /// Claim the right to probe. Only one caller wins per `Unprobed` phase.
    pub(crate) fn begin_stabilizing(&self) -> bool {
        self.phase
            .compare_exchange(
                PHASE_UNPROBED,
                PHASE_STABILIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Probe every source in order from index 0; the first healthy one
    /// becomes active.
    ///
    /// If none answer, the pointer falls back to index 0, the registry
    /// returns to `Unprobed` and `NoHealthySource` is reported. A cancelled
    /// or dropped probe leaves the pointer untouched and the phase `Unprobed`.
    pub async fn probe_and_stabilize(
        &self,
        relay: &dyn ContentRelay,
        cancel: &CancellationToken,
    ) -> Result<Source, CatalogError> {
        self.phase.store(PHASE_STABILIZING, Ordering::Release);
        let _guard = StabilizingGuard { phase: &self.phase };

        for (index, source) in self.sources.iter().enumerate() {
            let url = probe_url(source);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.phase.store(PHASE_UNPROBED, Ordering::Release);
                    return Err(CatalogError::Aborted);
                }
                outcome = relay.get_json(&url) => outcome,
            };

            match outcome {
                Ok(body) if is_success_shape(&body) => {
                    self.active.store(index, Ordering::Release);
                    self.pinned.store(false, Ordering::Release);
                    self.phase.store(PHASE_STABLE, Ordering::Release);
                    tracing::info!("source stabilized on {} (index {})", source.name, index);
                    return Ok(source.clone());
                }
                Ok(_) => {
                    tracing::warn!("probe of {} returned an unrecognized body", source.name);
                }
                Err(RelayError::Aborted) => {
                    self.phase.store(PHASE_UNPROBED, Ordering::Release);
                    return Err(CatalogError::Aborted);
                }
                Err(e) => {
                    tracing::warn!("probe of {} failed: {}", source.name, e);
                }
            }
        }

        self.active.store(0, Ordering::Release);
        self.phase.store(PHASE_UNPROBED, Ordering::Release);
        tracing::error!(
            "no source answered the probe, falling back to {}",
            self.sources[0].name
        );
        Err(CatalogError::NoHealthySource)
    }
}

/// Returns the phase to `Unprobed` if a probe future is dropped mid-flight.
///
/// Completed probes have already left `Stabilizing`; a concurrent pin is
/// never overwritten.
struct StabilizingGuard<'a> {
    phase: &'a AtomicU8,
}

impl Drop for StabilizingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.phase.compare_exchange(
            PHASE_STABILIZING,
            PHASE_UNPROBED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Health probe URL: the dialect's lightweight categories endpoint.
pub fn probe_url(source: &Source) -> String {
    format!(
        "{}{}{}",
        source.base_url,
        source.dialect.api_prefix(),
        source.dialect.probe_path()
    )
}

/// `status: true` or `status: "success"`.
pub fn is_success_shape(body: &Value) -> bool {
    match body.get("status") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::String(s)) => s == "success",
        _ => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::value_objects::Dialect;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    // ===== Mock Implementations =====

    struct StalledRelay;

    #[async_trait]
    impl ContentRelay for StalledRelay {
        async fn get_json(&self, _url: &str) -> Result<Value, RelayError> {
            std::future::pending().await
        }
    }

    /// Relay that succeeds only for URLs starting with one of `healthy`.
    struct MockRelay {
        healthy: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockRelay {
        fn new(healthy: &[&str]) -> Self {
            Self {
                healthy: healthy.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentRelay for MockRelay {
        async fn get_json(&self, url: &str) -> Result<Value, RelayError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.healthy.iter().any(|h| url.starts_with(h.as_str())) {
                Ok(json!({"status": "success", "data": {"items": []}}))
            } else {
                Err(RelayError::Transport("connection refused".into()))
            }
        }
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::new(Source::defaults()).unwrap()
    }

    // ===== Construction Tests =====

    #[test]
    fn test_empty_registry_is_rejected() {
        assert_eq!(
            SourceRegistry::new(vec![]).unwrap_err(),
            CatalogError::EmptyRegistry
        );
    }

    #[test]
    fn test_initial_state() {
        let registry = registry();
        assert_eq!(registry.active_index(), 0);
        assert_eq!(registry.active().name, "OPhim1");
        assert_eq!(registry.state(), SourceState::Unprobed);
        assert!(!registry.is_pinned());
        assert_eq!(registry.list_sources().len(), 4);
    }

    // ===== Rotation Tests =====

    #[test]
    fn test_rotate_wraps() {
        let registry = registry();
        assert_eq!(registry.rotate_to_next().name, "OPhim17");
        assert_eq!(registry.rotate_to_next().name, "KKPhim");
        assert_eq!(registry.rotate_to_next().name, "NguonC");
        assert_eq!(registry.rotate_to_next().name, "OPhim1");
        assert_eq!(registry.active_index(), 0);
    }

    #[test]
    fn test_single_source_rotates_to_itself() {
        let registry =
            SourceRegistry::new(vec![Source::new("Only", "https://only", Dialect::OPhim)]).unwrap();
        assert_eq!(registry.rotate_to_next().name, "Only");
    }

    // ===== Pin Tests =====

    #[test]
    fn test_pin_by_name() {
        let registry = registry();
        assert!(registry.set_active_by_name("KKPhim"));
        assert_eq!(registry.active().name, "KKPhim");
        assert_eq!(registry.state(), SourceState::Stable(2));
        assert!(registry.is_pinned());

        // Rotation resumes from the pinned point and clears the pin.
        assert_eq!(registry.rotate_to_next().name, "NguonC");
        assert!(!registry.is_pinned());
    }

    #[test]
    fn test_pin_unknown_is_noop() {
        let registry = registry();
        registry.rotate_to_next();
        assert!(!registry.set_active_by_name("Netflix"));
        assert_eq!(registry.active_index(), 1);
        assert_eq!(registry.state(), SourceState::Unprobed);
    }

    #[test]
    fn test_begin_stabilizing_claims_once() {
        let registry = registry();
        assert!(registry.begin_stabilizing());
        assert!(!registry.begin_stabilizing());
        assert_eq!(registry.state(), SourceState::Stabilizing);
    }

    // ===== Probe Tests =====

    #[tokio::test]
    async fn test_probe_picks_first_healthy() {
        let registry = registry();
        let relay = MockRelay::new(&["https://kkphim.vip"]);

        let source = registry
            .probe_and_stabilize(&relay, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.name, "KKPhim");
        assert_eq!(registry.state(), SourceState::Stable(2));
        assert_eq!(
            relay.calls(),
            vec![
                "https://ophim1.com/v1/api/the-loai",
                "https://ophim17.cc/v1/api/the-loai",
                "https://kkphim.vip/v1/api/the-loai",
            ]
        );
    }

    #[tokio::test]
    async fn test_probe_uses_dialect_probe_path() {
        let registry = registry();
        let relay = MockRelay::new(&["https://phim.nguonc.com"]);

        let source = registry
            .probe_and_stabilize(&relay, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.name, "NguonC");
        assert_eq!(
            relay.calls().last().unwrap(),
            "https://phim.nguonc.com/api/films/the-loai/hanh-dong"
        );
    }

    #[tokio::test]
    async fn test_probe_all_fail_falls_back_to_zero() {
        let registry = registry();
        registry.rotate_to_next();
        let relay = MockRelay::new(&[]);

        let result = registry
            .probe_and_stabilize(&relay, &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), CatalogError::NoHealthySource);
        assert_eq!(registry.active_index(), 0);
        assert_eq!(registry.state(), SourceState::Unprobed);
        assert_eq!(relay.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_probe_cancelled() {
        let registry = registry();
        let relay = MockRelay::new(&["https://ophim1.com"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = registry.probe_and_stabilize(&relay, &cancel).await;
        assert_eq!(result.unwrap_err(), CatalogError::Aborted);
        assert_eq!(registry.state(), SourceState::Unprobed);
    }

    #[test]
    fn test_success_shapes() {
        assert!(is_success_shape(&json!({"status": true})));
        assert!(is_success_shape(&json!({"status": "success"})));
        assert!(!is_success_shape(&json!({"status": false})));
        assert!(!is_success_shape(&json!({"status": "error"})));
        assert!(!is_success_shape(&json!({"items": []})));
    }

    #[test]
    fn test_state_serializes() {
        let json = serde_json::to_value(SourceState::Stable(1)).unwrap();
        assert_eq!(json, json!({"state": "stable", "index": 1}));
        let json = serde_json::to_value(SourceState::Unprobed).unwrap();
        assert_eq!(json, json!({"state": "unprobed"}));
    }

    #[tokio::test]
    async fn test_dropped_stabilization_returns_to_unprobed() {
        let registry = registry();
        let cancel = CancellationToken::new();

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            registry.probe_and_stabilize(&StalledRelay, &cancel),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(registry.state(), SourceState::Unprobed);
        assert!(registry.begin_stabilizing());
    }

    #[tokio::test]
    async fn test_dropped_stabilization_keeps_concurrent_pin() {
        let registry = registry();
        let cancel = CancellationToken::new();

        {
            let probe = registry.probe_and_stabilize(&StalledRelay, &cancel);
            tokio::pin!(probe);
            assert!(futures::poll!(probe.as_mut()).is_pending());
            registry.set_active_by_name("KKPhim");
        }

        assert_eq!(registry.state(), SourceState::Stable(2));
    }
}
