//! Memory coordinator (spec §4.5.1, invariant P-cache-budget): registers
//! named caches and keeps their combined memory under a configured budget.
//!
//! Grounded in the teacher's `memory-storage-redb::cache::adaptive` module
//! (background-task-driven accounting with a `tracing`-logged eviction
//! path), generalized here from one adaptive LRU cache to many
//! heterogeneous registered caches sharing a priority-weighted budget.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::types::CacheCoordinatorConfig;

/// Maximum priority a registered cache may claim; used as the upper bound
/// in the `(limit - priority) + 1` eviction-weight formula (spec §4.5.1).
const MAX_PRIORITY: i32 = 10;

/// A cache the coordinator can query for size and ask to shed entries.
/// Implementors own their locking; every method takes `&self` so the
/// coordinator never needs a write lock on the registry just to evict.
pub trait CacheHandle: Send + Sync {
    /// Current resident size, in megabytes.
    fn size_mb(&self) -> f64;

    /// Evict up to `target_mb` worth of entries, returning how much was
    /// actually freed. Implementations should never interpret `target_mb`
    /// as "clear everything" even if it exceeds the cache's current size.
    fn evict(&self, target_mb: f64) -> Result<f64, String>;
}

struct Registration {
    handle: Arc<dyn CacheHandle>,
    priority: i32,
}

/// One cache's contribution to an eviction pass.
#[derive(Debug, Clone)]
pub struct CacheEvictionRecord {
    pub name: String,
    pub requested_mb: f64,
    pub evicted_mb: f64,
    pub error: Option<String>,
}

/// Result of one accounting pass, whether or not it evicted anything.
#[derive(Debug, Clone)]
pub struct EvictionReport {
    pub total_before_mb: f64,
    pub total_after_mb: f64,
    pub per_cache: Vec<CacheEvictionRecord>,
}

impl EvictionReport {
    fn noop(total_mb: f64) -> Self {
        Self {
            total_before_mb: total_mb,
            total_after_mb: total_mb,
            per_cache: Vec::new(),
        }
    }
}

/// Coordinates eviction across every registered cache against one shared
/// memory budget (spec §4.5.1).
pub struct MemoryCoordinator {
    config: RwLock<CacheCoordinatorConfig>,
    caches: RwLock<HashMap<String, Registration>>,
    last_check: Mutex<Instant>,
}

impl MemoryCoordinator {
    #[must_use]
    pub fn new(config: CacheCoordinatorConfig) -> Self {
        // Seed `last_check` far enough in the past that the very first
        // `tick()` always fires, regardless of `checkIntervalMs`.
        let initial = Instant::now().checked_sub(Duration::from_secs(3600)).unwrap_or_else(Instant::now);
        Self {
            config: RwLock::new(config),
            caches: RwLock::new(HashMap::new()),
            last_check: Mutex::new(initial),
        }
    }

    /// Register (or replace) a named cache. `priority` is clamped to
    /// `[0, 10]`; lower values lose proportionally more under pressure.
    pub fn register(&self, name: impl Into<String>, handle: Arc<dyn CacheHandle>, priority: i32) {
        let priority = priority.clamp(0, MAX_PRIORITY);
        self.caches.write().insert(name.into(), Registration { handle, priority });
    }

    /// Idempotent: unregistering an unknown name is a no-op.
    pub fn unregister(&self, name: &str) {
        self.caches.write().remove(name);
    }

    /// Replace the configuration atomically and restart the check timer
    /// (spec §4.5.1: "changing `checkIntervalMs` restarts the timer").
    pub fn update_config(&self, config: CacheCoordinatorConfig) {
        *self.config.write() = config;
        *self.last_check.lock() = Instant::now();
    }

    #[must_use]
    pub fn config(&self) -> CacheCoordinatorConfig {
        self.config.read().clone()
    }

    #[must_use]
    pub fn total_memory_mb(&self) -> f64 {
        self.caches.read().values().map(|r| r.handle.size_mb()).sum()
    }

    /// Run the accounting pass if at least `checkIntervalMs` has elapsed
    /// since the last run; otherwise return `None` without touching any
    /// cache. Callers drive this with their own clock so tests can
    /// fast-forward without sleeping.
    pub fn tick(&self, now: Instant) -> Option<EvictionReport> {
        let interval = Duration::from_millis(self.config.read().check_interval_ms);
        let mut last = self.last_check.lock();
        if now.duration_since(*last) < interval {
            return None;
        }
        *last = now;
        drop(last);
        Some(self.account_and_evict())
    }

    /// Run the accounting pass unconditionally, bypassing the interval
    /// gate, and reset the timer as if a regular tick had just fired.
    pub fn force_check(&self) -> EvictionReport {
        *self.last_check.lock() = Instant::now();
        self.account_and_evict()
    }

    fn account_and_evict(&self) -> EvictionReport {
        let config = self.config.read().clone();
        let caches = self.caches.read();
        let sizes: Vec<(String, f64, i32)> = caches.iter().map(|(name, r)| (name.clone(), r.handle.size_mb(), r.priority)).collect();
        let total_before: f64 = sizes.iter().map(|(_, size, _)| size).sum();

        let pressure = config.total_limit_mb * config.pressure_threshold;
        if total_before <= pressure {
            return EvictionReport::noop(total_before);
        }

        let target = config.total_limit_mb * config.eviction_target;
        let excess = (total_before - target).max(0.0);
        let weights: Vec<(String, f64, f64)> = sizes
            .into_iter()
            .map(|(name, size, priority)| (name, f64::from(MAX_PRIORITY - priority) + 1.0, size))
            .collect();
        let weight_sum: f64 = weights.iter().map(|(_, w, _)| w).sum();

        let mut per_cache = Vec::new();
        let mut freed = 0.0;
        for (name, weight, size) in weights {
            if weight_sum <= 0.0 || size <= 0.0 {
                continue;
            }
            let share = excess * (weight / weight_sum);
            // Never ask a cache to shed more than 90% of itself in one pass
            // (spec §4.5.1: "never full-clears a cache in one pass").
            let requested = share.min(size * 0.9);
            if requested <= 0.0 {
                continue;
            }
            let Some(registration) = caches.get(&name) else {
                continue;
            };
            match registration.handle.evict(requested) {
                Ok(evicted) => {
                    freed += evicted;
                    per_cache.push(CacheEvictionRecord {
                        name,
                        requested_mb: requested,
                        evicted_mb: evicted,
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(cache = %name, error = %err, "cache eviction failed during accounting pass");
                    per_cache.push(CacheEvictionRecord {
                        name,
                        requested_mb: requested,
                        evicted_mb: 0.0,
                        error: Some(err),
                    });
                }
            }
        }

        EvictionReport {
            total_before_mb: total_before,
            total_after_mb: (total_before - freed).max(0.0),
            per_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    struct FakeCache {
        size_mb: PlMutex<f64>,
        fail: bool,
    }

    impl FakeCache {
        fn new(size_mb: f64) -> Arc<Self> {
            Arc::new(Self { size_mb: PlMutex::new(size_mb), fail: false })
        }

        fn failing(size_mb: f64) -> Arc<Self> {
            Arc::new(Self { size_mb: PlMutex::new(size_mb), fail: true })
        }
    }

    impl CacheHandle for FakeCache {
        fn size_mb(&self) -> f64 {
            *self.size_mb.lock()
        }

        fn evict(&self, target_mb: f64) -> Result<f64, String> {
            if self.fail {
                return Err("boom".to_string());
            }
            let mut size = self.size_mb.lock();
            let evicted = target_mb.min(*size);
            *size -= evicted;
            Ok(evicted)
        }
    }

    fn config() -> CacheCoordinatorConfig {
        CacheCoordinatorConfig {
            pressure_threshold: 0.8,
            eviction_target: 0.7,
            total_limit_mb: 100.0,
            check_interval_ms: 1_000,
        }
    }

    #[test]
    fn below_pressure_threshold_no_eviction() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.register("a", FakeCache::new(50.0), 5);
        let report = coordinator.force_check();
        assert!(report.per_cache.is_empty());
        assert!((report.total_after_mb - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn over_pressure_evicts_down_to_target_and_low_priority_loses_more() {
        let coordinator = MemoryCoordinator::new(config());
        let low = FakeCache::new(50.0);
        let high = FakeCache::new(50.0);
        coordinator.register("low", low.clone(), 0);
        coordinator.register("high", high.clone(), 10);

        let report = coordinator.force_check();
        assert!(report.total_after_mb <= 70.0 + 1e-6);

        let low_record = report.per_cache.iter().find(|r| r.name == "low").unwrap();
        let high_record = report.per_cache.iter().find(|r| r.name == "high").unwrap();
        assert!(low_record.evicted_mb > high_record.evicted_mb);
    }

    #[test]
    fn eviction_never_fully_clears_a_cache_in_one_pass() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.register("only", FakeCache::new(90.0), 0);
        let report = coordinator.force_check();
        assert!(report.total_after_mb > 0.0);
    }

    #[test]
    fn failing_cache_is_logged_and_skipped_without_panicking() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.register("broken", FakeCache::failing(90.0), 0);
        let report = coordinator.force_check();
        assert_eq!(report.per_cache.len(), 1);
        assert!(report.per_cache[0].error.is_some());
        assert!((report.per_cache[0].evicted_mb).abs() < f64::EPSILON);
    }

    #[test]
    fn tick_respects_interval_gate() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.register("a", FakeCache::new(90.0), 5);
        let start = Instant::now();
        assert!(coordinator.tick(start).is_some());
        assert!(coordinator.tick(start).is_none());
        assert!(coordinator.tick(start + Duration::from_secs(2)).is_some());
    }

    #[test]
    fn unregister_is_idempotent() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.unregister("never-registered");
        coordinator.register("a", FakeCache::new(10.0), 5);
        coordinator.unregister("a");
        coordinator.unregister("a");
        assert!((coordinator.total_memory_mb()).abs() < f64::EPSILON);
    }

    #[test]
    fn priority_is_clamped_to_valid_range() {
        let coordinator = MemoryCoordinator::new(config());
        coordinator.register("a", FakeCache::new(90.0), 999);
        coordinator.register("b", FakeCache::new(10.0), -5);
        let report = coordinator.force_check();
        assert!(!report.per_cache.is_empty());
    }

    #[test]
    fn update_config_restarts_the_timer() {
        let coordinator = MemoryCoordinator::new(config());
        let now = Instant::now();
        coordinator.tick(now);
        coordinator.update_config(config());
        assert!(coordinator.tick(now).is_none());
    }
}
