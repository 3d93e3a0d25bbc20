//! Text -> classification cache with LRU eviction and TTL (spec §4.3.1
//! "Cache: text -> result cache with LRU eviction... Forced-mode results
//! are NOT cached").
//!
//! Grounded in the teacher's `retrieval::cache::lru::QueryCache` (LRU +
//! TTL over a hashed key), adapted to `parking_lot` locking for
//! consistency with the rest of this crate.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use super::ClassificationResult;

struct CachedEntry {
    result: ClassificationResult,
    cached_at: Instant,
}

/// Keys include the `preferLLM` flag per spec §9's open-question
/// recommendation ("include it to prevent cross-mode pollution").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassifyCacheKey {
    pub text_hash: u64,
    pub prefer_llm: bool,
}

pub struct ClassifyCache {
    entries: Mutex<LruCache<ClassifyCacheKey, CachedEntry>>,
    ttl: Duration,
}

impl ClassifyCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).expect("capped above zero"))),
            ttl,
        }
    }

    #[must_use]
    pub fn get(&self, key: ClassifyCacheKey) -> Option<ClassificationResult> {
        let mut entries = self.entries.lock();
        let entry = entries.get(&key)?;
        if entry.cached_at.elapsed() > self.ttl {
            entries.pop(&key);
            return None;
        }
        Some(entry.result.clone())
    }

    pub fn put(&self, key: ClassifyCacheKey, result: ClassificationResult) {
        self.entries.lock().put(
            key,
            CachedEntry {
                result,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every cached entry for this text, regardless of `prefer_llm`
    /// mode, so a correction's effect on pattern confidence is visible on
    /// the next classification of the same text (spec §8 scenario 3).
    pub fn invalidate_text(&self, text_hash: u64) {
        let mut entries = self.entries.lock();
        let stale: Vec<ClassifyCacheKey> = entries
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| k.text_hash == text_hash)
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassificationMethod, ClassifiedType};

    fn sample() -> ClassificationResult {
        ClassificationResult {
            classified_type: ClassifiedType::Guideline,
            confidence: 0.8,
            method: ClassificationMethod::Regex,
            reasoning: None,
            adjusted_by_feedback: false,
        }
    }

    #[test]
    fn hit_within_ttl_miss_after_expiry() {
        let cache = ClassifyCache::new(10, Duration::from_millis(0));
        let key = ClassifyCacheKey { text_hash: 1, prefer_llm: false };
        cache.put(key, sample());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(key).is_none());
    }

    #[test]
    fn prefer_llm_flag_is_part_of_the_key() {
        let cache = ClassifyCache::new(10, Duration::from_secs(60));
        let a = ClassifyCacheKey { text_hash: 1, prefer_llm: false };
        let b = ClassifyCacheKey { text_hash: 1, prefer_llm: true };
        cache.put(a, sample());
        assert!(cache.get(a).is_some());
        assert!(cache.get(b).is_none());
    }

    #[test]
    fn invalidate_text_drops_both_modes() {
        let cache = ClassifyCache::new(10, Duration::from_secs(60));
        let a = ClassifyCacheKey { text_hash: 7, prefer_llm: false };
        let b = ClassifyCacheKey { text_hash: 7, prefer_llm: true };
        cache.put(a, sample());
        cache.put(b, sample());
        cache.invalidate_text(7);
        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_none());
    }
}
