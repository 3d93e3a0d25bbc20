//! Rate limiter (spec §4.5.3, invariant P-rate): one `RateLimiter`
//! interface backing both a local token-bucket implementation and a
//! remote-counter implementation with three unreachable-backend fail modes.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::warn;

use crate::types::{RateLimiterConfig, RateLimiterFailMode, RateLimiterMode};

/// Outcome of one `check(key)` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_ms: u64,
    pub retry_after_ms: Option<u64>,
}

/// Outcome of one `stats(key)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitStats {
    pub count: u32,
}

/// Keys are opaque byte-ish strings (spec: "must tolerate arbitrary
/// printable and control bytes"); no implementation here inspects or
/// sanitizes key contents beyond using them as a map key.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateLimitDecision;
    fn stats(&self, key: &str) -> RateLimitStats;
}

struct Bucket {
    window_start: Instant,
    count_in_window: u32,
    second_start: Instant,
    count_in_second: u32,
}

impl Bucket {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count_in_window: 0,
            second_start: now,
            count_in_second: 0,
        }
    }
}

/// Token-bucket-per-key limiter (spec §4.5.3 "Local"). A single mutex
/// around the whole table serializes concurrent checks, which is what
/// guarantees the total allowed within a window never exceeds
/// `maxRequests` even under concurrent bursts.
pub struct LocalRateLimiter {
    max_requests: u32,
    window: Duration,
    min_burst_protection: Option<u32>,
    buckets: Mutex<LruCache<String, Bucket>>,
}

impl LocalRateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window_ms: u64, min_burst_protection: Option<u32>) -> Self {
        Self::with_capacity(max_requests, window_ms, min_burst_protection, crate::constants::DEFAULT_RATE_LIMITER_MAX_KEYS)
    }

    /// Like [`Self::new`], but with an explicit cap on resident keys
    /// (spec §4.5.3: the local limiter must LRU-evict once a bound is
    /// exceeded so an attacker enumerating keys can't exhaust memory).
    #[must_use]
    pub fn with_capacity(max_requests: u32, window_ms: u64, min_burst_protection: Option<u32>, max_tracked_keys: usize) -> Self {
        Self {
            max_requests,
            window: Duration::from_millis(window_ms),
            min_burst_protection,
            buckets: Mutex::new(LruCache::new(NonZeroUsize::new(max_tracked_keys.max(1)).expect("capped above zero"))),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimiterConfig) -> Self {
        Self::with_capacity(config.max_requests, config.window_ms, config.min_burst_protection, config.max_tracked_keys)
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut buckets = self.buckets.lock();
        if !buckets.contains(key) {
            buckets.put(key.to_string(), Bucket::new(now));
        }
        let bucket = buckets.get_mut(key).expect("just inserted or already present");

        // `duration_since` saturates to zero if `now` is ever behind the
        // stored reference (it never panics), so a backward system-clock
        // jump cannot manufacture extra quota here since both sides are
        // monotonic `Instant`s, not wall-clock timestamps.
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.window_start = now;
            bucket.count_in_window = 0;
        }
        if let Some(burst) = self.min_burst_protection {
            if now.duration_since(bucket.second_start) >= Duration::from_secs(1) {
                bucket.second_start = now;
                bucket.count_in_second = 0;
            }
            if bucket.count_in_second >= burst {
                let reset_ms = (Duration::from_secs(1).saturating_sub(now.duration_since(bucket.second_start))).as_millis() as u64;
                return RateLimitDecision {
                    allowed: false,
                    remaining: self.max_requests.saturating_sub(bucket.count_in_window),
                    reset_ms,
                    retry_after_ms: Some(reset_ms),
                };
            }
        }

        if bucket.count_in_window >= self.max_requests {
            let reset_ms = (self.window.saturating_sub(now.duration_since(bucket.window_start))).as_millis() as u64;
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_ms,
                retry_after_ms: Some(reset_ms),
            };
        }

        bucket.count_in_window += 1;
        bucket.count_in_second += 1;
        let reset_ms = (self.window.saturating_sub(now.duration_since(bucket.window_start))).as_millis() as u64;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests.saturating_sub(bucket.count_in_window),
            reset_ms,
            retry_after_ms: None,
        }
    }
}

impl RateLimiter for LocalRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn stats(&self, key: &str) -> RateLimitStats {
        let buckets = self.buckets.lock();
        RateLimitStats {
            count: buckets.peek(key).map_or(0, |b| b.count_in_window),
        }
    }
}

/// Result of one remote backend probe.
#[derive(Debug, Clone, Copy)]
pub struct RemoteCheckResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_ms: u64,
}

/// Out-of-process counter the remote limiter consults. No concrete
/// implementation ships in this crate; callers supply their own (HTTP
/// client, Redis, etc.) behind this trait.
pub trait RemoteBackend: Send + Sync {
    fn check(&self, key: &str) -> Result<RemoteCheckResult, String>;
    fn stats(&self, key: &str) -> Result<RateLimitStats, String>;
}

/// Remote-counter limiter with one of three behaviors when the backend is
/// unreachable (spec §4.5.3 "Remote").
pub struct RemoteRateLimiter {
    backend: Arc<dyn RemoteBackend>,
    fail_mode: RateLimiterFailMode,
    fallback: LocalRateLimiter,
}

impl RemoteRateLimiter {
    #[must_use]
    pub fn new(backend: Arc<dyn RemoteBackend>, config: &RateLimiterConfig) -> Self {
        Self {
            backend,
            fail_mode: config.fail_mode,
            fallback: LocalRateLimiter::from_config(config),
        }
    }
}

/// Fixed deny-all retry hint for `closed` fail mode (spec §4.5.3).
const CLOSED_RETRY_AFTER_MS: u64 = 60_000;

impl RateLimiter for RemoteRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        match self.backend.check(key) {
            Ok(result) => RateLimitDecision {
                allowed: result.allowed,
                remaining: result.remaining,
                reset_ms: result.reset_ms,
                retry_after_ms: if result.allowed { None } else { Some(result.reset_ms) },
            },
            Err(err) => match self.fail_mode {
                RateLimiterFailMode::Closed => {
                    warn!(error = %err, "remote rate limiter unreachable, denying all (fail-mode: closed)");
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_ms: CLOSED_RETRY_AFTER_MS,
                        retry_after_ms: Some(CLOSED_RETRY_AFTER_MS),
                    }
                }
                RateLimiterFailMode::LocalFallback => {
                    warn!(error = %err, "remote rate limiter unreachable, falling back to local limiter");
                    self.fallback.check(key)
                }
                RateLimiterFailMode::Open => {
                    warn!(error = %err, "remote rate limiter unreachable, allowing all (fail-mode: open, security risk)");
                    RateLimitDecision {
                        allowed: true,
                        remaining: u32::MAX,
                        reset_ms: 0,
                        retry_after_ms: None,
                    }
                }
            },
        }
    }

    fn stats(&self, key: &str) -> RateLimitStats {
        self.backend.stats(key).unwrap_or_else(|_| self.fallback.stats(key))
    }
}

/// Build the configured limiter. `backend` is only consulted in
/// [`RateLimiterMode::Remote`]; pass `None` to force local mode regardless
/// of `config.mode` (e.g. when no remote backend is wired up yet).
#[must_use]
pub fn build_rate_limiter(config: &RateLimiterConfig, backend: Option<Arc<dyn RemoteBackend>>) -> Arc<dyn RateLimiter> {
    match (config.mode, backend) {
        (RateLimiterMode::Remote, Some(backend)) => Arc::new(RemoteRateLimiter::new(backend, config)),
        _ => Arc::new(LocalRateLimiter::from_config(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_requests_then_denies_within_window() {
        let limiter = LocalRateLimiter::new(3, 60_000, None);
        let now = Instant::now();
        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        let fourth = limiter.check_at("k", now);
        assert!(!fourth.allowed);
        assert!(fourth.retry_after_ms.is_some());
    }

    #[test]
    fn window_resets_after_elapsed_duration() {
        let limiter = LocalRateLimiter::new(2, 1_000, None);
        let now = Instant::now();
        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now + Duration::from_secs(2)).allowed);
    }

    #[test]
    fn min_burst_protection_caps_per_second_independently_of_window() {
        let limiter = LocalRateLimiter::new(100, 60_000, Some(1));
        let now = Instant::now();
        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now + Duration::from_secs(1)).allowed);
    }

    #[test]
    fn different_keys_have_independent_buckets() {
        let limiter = LocalRateLimiter::new(1, 60_000, None);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
    }

    #[test]
    fn keys_with_control_bytes_are_handled_like_any_other_string() {
        let limiter = LocalRateLimiter::new(2, 60_000, None);
        let key = "agent\u{0}\u{1}\n\t\u{7}-weird";
        assert!(limiter.check(key).allowed);
        assert!(limiter.check(key).allowed);
        assert!(!limiter.check(key).allowed);
    }

    #[test]
    fn resident_keys_are_capped_with_lru_eviction() {
        let limiter = LocalRateLimiter::with_capacity(5, 60_000, None, 2);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        // Touching "c" evicts the least-recently-used key ("a"), capping
        // resident buckets at 2 no matter how many distinct keys arrive.
        assert!(limiter.check_at("c", now).allowed);
        assert_eq!(limiter.buckets.lock().len(), 2);
        assert!(!limiter.buckets.lock().contains("a"));
        // "a" is a fresh bucket again, not denied by stale state.
        assert!(limiter.check_at("a", now).allowed);
    }

    #[test]
    fn stats_reports_count_in_current_window() {
        let limiter = LocalRateLimiter::new(5, 60_000, None);
        let now = Instant::now();
        limiter.check_at("k", now);
        limiter.check_at("k", now);
        assert_eq!(limiter.stats("k").count, 2);
    }

    struct FailingBackend;
    impl RemoteBackend for FailingBackend {
        fn check(&self, _key: &str) -> Result<RemoteCheckResult, String> {
            Err("unreachable".to_string())
        }
        fn stats(&self, _key: &str) -> Result<RateLimitStats, String> {
            Err("unreachable".to_string())
        }
    }

    struct WorkingBackend;
    impl RemoteBackend for WorkingBackend {
        fn check(&self, _key: &str) -> Result<RemoteCheckResult, String> {
            Ok(RemoteCheckResult { allowed: true, remaining: 9, reset_ms: 1_000 })
        }
        fn stats(&self, _key: &str) -> Result<RateLimitStats, String> {
            Ok(RateLimitStats { count: 1 })
        }
    }

    fn remote_config(fail_mode: RateLimiterFailMode) -> RateLimiterConfig {
        RateLimiterConfig {
            mode: RateLimiterMode::Remote,
            fail_mode,
            max_requests: 10,
            window_ms: 60_000,
            min_burst_protection: None,
            max_tracked_keys: crate::constants::DEFAULT_RATE_LIMITER_MAX_KEYS,
        }
    }

    #[test]
    fn unreachable_backend_with_closed_fail_mode_denies_all() {
        let limiter = RemoteRateLimiter::new(Arc::new(FailingBackend), &remote_config(RateLimiterFailMode::Closed));
        let decision = limiter.check("k");
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_ms, Some(60_000));
    }

    #[test]
    fn unreachable_backend_with_open_fail_mode_allows_all() {
        let limiter = RemoteRateLimiter::new(Arc::new(FailingBackend), &remote_config(RateLimiterFailMode::Open));
        assert!(limiter.check("k").allowed);
    }

    #[test]
    fn unreachable_backend_with_local_fallback_uses_embedded_limiter() {
        let limiter = RemoteRateLimiter::new(Arc::new(FailingBackend), &remote_config(RateLimiterFailMode::LocalFallback));
        let decision = limiter.check("k");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[test]
    fn reachable_backend_is_used_directly() {
        let limiter = RemoteRateLimiter::new(Arc::new(WorkingBackend), &remote_config(RateLimiterFailMode::Closed));
        let decision = limiter.check("k");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[test]
    fn build_rate_limiter_picks_local_when_no_backend_supplied() {
        let config = RateLimiterConfig::default();
        let limiter = build_rate_limiter(&config, None);
        assert!(limiter.check("k").allowed);
    }
}
