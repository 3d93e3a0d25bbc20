//! Periodic file-lock cleanup (spec §4.5.2: "a scheduled
//! `cleanupExpiredLocks()` reports the number purged"), using the same
//! interval-gated, fake-clock-safe shape as [`super::cache::MemoryCoordinator`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::repositories::LockRepository;

/// Wraps [`LockRepository::cleanup_expired`] behind a timer so callers can
/// wire it into a periodic sweep without re-implementing the gating logic.
pub struct LockCleanupScheduler {
    repo: Arc<LockRepository>,
    interval: Duration,
    last_run: Mutex<Instant>,
}

impl LockCleanupScheduler {
    #[must_use]
    pub fn new(repo: Arc<LockRepository>, interval: Duration) -> Self {
        let initial = Instant::now().checked_sub(Duration::from_secs(3600)).unwrap_or_else(Instant::now);
        Self {
            repo,
            interval,
            last_run: Mutex::new(initial),
        }
    }

    /// Run cleanup if `interval` has elapsed since the last run; otherwise
    /// return `None` without touching the repository.
    pub fn tick(&self, now: Instant) -> Option<usize> {
        let mut last = self.last_run.lock();
        if now.duration_since(*last) < self.interval {
            return None;
        }
        *last = now;
        drop(last);
        Some(self.repo.cleanup_expired())
    }

    /// Run cleanup unconditionally and reset the timer.
    pub fn force_run(&self) -> usize {
        *self.last_run.lock() = Instant::now();
        self.repo.cleanup_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::types::FileLock;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn force_run_purges_expired_locks_immediately() {
        let db = Arc::new(Database::new());
        let repo = Arc::new(LockRepository::new(db.clone()));
        let expired = FileLock {
            file_path: "/a/b.ts".into(),
            checked_out_by: "agent-1".into(),
            checked_out_at: Utc::now() - ChronoDuration::seconds(10),
            expires_at: Some(Utc::now() - ChronoDuration::seconds(1)),
        };
        db.put_lock(expired);

        let scheduler = LockCleanupScheduler::new(repo, Duration::from_secs(60));
        assert_eq!(scheduler.force_run(), 1);
    }

    #[test]
    fn tick_respects_interval_gate() {
        let db = Arc::new(Database::new());
        let repo = Arc::new(LockRepository::new(db));
        let scheduler = LockCleanupScheduler::new(repo, Duration::from_secs(60));
        let now = Instant::now();
        assert!(scheduler.tick(now).is_some());
        assert!(scheduler.tick(now).is_none());
        assert!(scheduler.tick(now + Duration::from_secs(61)).is_some());
    }
}
