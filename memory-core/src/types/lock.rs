//! File-lock leases (spec §3 `FileLock`, §4.5.2, invariant P-lock).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLock {
    pub file_path: String,
    pub checked_out_by: String,
    pub checked_out_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileLock {
    /// Whether this lock has passed its expiry at instant `at`.
    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_expiring_lock_never_expires() {
        let lock = FileLock {
            file_path: "/a".into(),
            checked_out_by: "agent".into(),
            checked_out_at: Utc::now(),
            expires_at: None,
        };
        assert!(!lock.is_expired_at(Utc::now() + chrono::Duration::days(365)));
    }

    #[test]
    fn expired_lock_detected() {
        let lock = FileLock {
            file_path: "/a".into(),
            checked_out_by: "agent".into(),
            checked_out_at: Utc::now() - chrono::Duration::seconds(10),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(5)),
        };
        assert!(lock.is_expired_at(Utc::now()));
    }
}
