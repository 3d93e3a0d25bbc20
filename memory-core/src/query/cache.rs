//! Post-merge result cache (spec §4.2 step 7 `DEFAULT_QUERY_CACHE_TTL_SECS`).
//!
//! Grounded in the teacher's TTL-cache idiom (the same `Instant`-keyed
//! expiry shape as `context::ContextDetector`'s single-entry cache),
//! generalized here to a keyed table since queries vary by fingerprint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::QueryResult;

struct Entry {
    result: QueryResult,
    expires_at: Instant,
}

pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl QueryCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<QueryResult> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: String, result: QueryResult) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            Entry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
        // Opportunistically drop expired rows so the table doesn't grow
        // unbounded across a long-lived process.
        entries.retain(|_, e| e.expires_at > Instant::now());
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryMeta;

    fn empty_result() -> QueryResult {
        QueryResult {
            items: Vec::new(),
            meta: QueryMeta::default(),
        }
    }

    #[test]
    fn cached_entry_served_within_ttl() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("k".to_string(), empty_result());
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn expired_entry_is_not_served() {
        let cache = QueryCache::new(Duration::from_millis(0));
        cache.put("k".to_string(), empty_result());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn clear_removes_all_entries() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("k".to_string(), empty_result());
        cache.clear();
        assert!(cache.get("k").is_none());
    }
}
