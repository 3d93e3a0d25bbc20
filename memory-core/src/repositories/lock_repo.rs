//! File-lock checkout/release (spec §3 `FileLock`, §4.5.2, invariant
//! P-lock: a non-expired lock blocks checkout by any other holder).

use crate::constants::MAX_LOCK_EXPIRES_IN_SECS;
use crate::error::{Error, Result};
use crate::storage::Database;
use crate::types::FileLock;
use chrono::{Duration, Utc};
use std::path::Component;
use std::sync::Arc;

/// Normalize a lock key to an absolute, `..`-resolved path (spec §4.5.2:
/// "Paths are normalized (relative→absolute, `..` segments resolved) at
/// the repository layer"). This crate has no process cwd to anchor a
/// relative path against, so a relative path is rooted at `/` rather than
/// resolved against the filesystem — callers that need cwd-relative
/// resolution must pass an already-rooted path.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    for component in std::path::Path::new(path).components() {
        match component {
            Component::ParentDir => {
                segments.pop();
            }
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    format!("/{}", segments.join("/"))
}

pub struct LockRepository {
    db: Arc<Database>,
}

impl LockRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Check out a lock on `file_path` for `checked_out_by`.
    ///
    /// `expires_in_secs == Some(0)` means non-expiring. A value above
    /// `MAX_LOCK_EXPIRES_IN_SECS` fails validation. An existing lock that
    /// has already expired is transparently reclaimed; a live lock held
    /// by a different agent is rejected.
    pub fn checkout(
        &self,
        file_path: impl Into<String>,
        checked_out_by: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> Result<FileLock> {
        let file_path = normalize_path(&file_path.into());
        let checked_out_by = checked_out_by.into();
        let now = Utc::now();

        if let Some(secs) = expires_in_secs {
            if secs > MAX_LOCK_EXPIRES_IN_SECS as i64 {
                return Err(Error::validation(
                    "expiresIn",
                    format!("expiresIn must not exceed {MAX_LOCK_EXPIRES_IN_SECS} seconds"),
                ));
            }
            if secs < 0 {
                return Err(Error::validation("expiresIn", "expiresIn must not be negative"));
            }
        }

        if let Some(existing) = self.db.get_lock(&file_path) {
            if !existing.is_expired_at(now) && existing.checked_out_by != checked_out_by {
                return Err(Error::validation(
                    "file_path",
                    format!("{file_path} is already checked out by {}", existing.checked_out_by),
                ));
            }
        }

        let expires_at = match expires_in_secs {
            None | Some(0) => None,
            Some(secs) => Some(now + Duration::seconds(secs)),
        };

        let lock = FileLock {
            file_path: file_path.clone(),
            checked_out_by,
            checked_out_at: now,
            expires_at,
        };
        self.db.put_lock(lock.clone());
        Ok(lock)
    }

    #[must_use]
    pub fn get(&self, file_path: &str) -> Option<FileLock> {
        self.db.get_lock(&normalize_path(file_path))
    }

    #[must_use]
    pub fn list(&self) -> Vec<FileLock> {
        self.db.list_locks()
    }

    /// Release a lock. Only the current holder (or any caller of an
    /// already-expired lock) may release it.
    pub fn release(&self, file_path: &str, released_by: &str) -> Result<()> {
        let file_path = normalize_path(file_path);
        let lock = self
            .db
            .get_lock(&file_path)
            .ok_or_else(|| Error::not_found(file_path.clone()))?;
        if !lock.is_expired_at(Utc::now()) && lock.checked_out_by != released_by {
            return Err(Error::validation(
                "file_path",
                format!("{file_path} is checked out by {}, not {released_by}", lock.checked_out_by),
            ));
        }
        self.db.remove_lock(&file_path);
        Ok(())
    }

    /// Purge all expired locks, returning the count removed (spec §4.5.2
    /// `cleanupExpiredLocks`).
    pub fn cleanup_expired(&self) -> usize {
        self.db.cleanup_expired_locks(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_parent_dir_segments_and_roots_relative_paths() {
        assert_eq!(normalize_path("a/../b/c"), "/b/c");
        assert_eq!(normalize_path("/a/./b"), "/a/b");
        assert_eq!(normalize_path("relative/path.ts"), "/relative/path.ts");
        assert_eq!(normalize_path("../../escape"), "/escape");
    }

    #[test]
    fn equivalent_paths_with_different_spelling_collide_on_the_same_lock() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        repo.checkout("a/../a/b.ts", "agent-1", None).unwrap();
        let err = repo.checkout("/a/b.ts", "agent-2", None);
        assert!(err.is_err());
    }

    #[test]
    fn checkout_blocks_other_holder_while_live() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        repo.checkout("/a/b.ts", "agent-1", None).unwrap();
        let err = repo.checkout("/a/b.ts", "agent-2", None);
        assert!(err.is_err());
    }

    #[test]
    fn expires_in_above_max_rejected() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        let err = repo.checkout("/a/b.ts", "agent-1", Some(MAX_LOCK_EXPIRES_IN_SECS as i64 + 1));
        assert!(matches!(err, Err(Error::Validation { .. })));
    }

    #[test]
    fn expired_lock_reclaimed_by_different_agent() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        let lock = FileLock {
            file_path: "/a/b.ts".into(),
            checked_out_by: "agent-1".into(),
            checked_out_at: Utc::now() - Duration::seconds(10),
            expires_at: Some(Utc::now() - Duration::seconds(1)),
        };
        repo.db.put_lock(lock);
        let reclaimed = repo.checkout("/a/b.ts", "agent-2", None);
        assert!(reclaimed.is_ok());
    }

    #[test]
    fn release_by_non_holder_rejected() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        repo.checkout("/a/b.ts", "agent-1", None).unwrap();
        let err = repo.release("/a/b.ts", "agent-2");
        assert!(err.is_err());
    }

    #[test]
    fn cleanup_expired_reports_purge_count() {
        let repo = LockRepository::new(Arc::new(Database::new()));
        let lock = FileLock {
            file_path: "/a/b.ts".into(),
            checked_out_by: "agent-1".into(),
            checked_out_at: Utc::now() - Duration::seconds(10),
            expires_at: Some(Utc::now() - Duration::seconds(1)),
        };
        repo.db.put_lock(lock);
        assert_eq!(repo.cleanup_expired(), 1);
    }
}
