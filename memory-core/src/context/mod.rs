//! Context detection: working-directory + environment -> `{project,
//! session, agentId}` triple with a clearable TTL cache (spec §4.6).
//!
//! Grounded in the teacher's cache-with-TTL style used throughout
//! `memory-core` (e.g. the classification cache, spec-supplemented
//! `classify::cache`) generalized to this narrower detection job; concrete
//! filesystem/git probing is environment-specific glue the spec leaves to
//! the (out-of-scope) request router, so detection here is expressed as a
//! pluggable `ContextSource`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Where a detected field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Explicitly supplied by the caller.
    Explicit,
    /// Derived from the working directory / environment.
    Detected,
    /// No signal found; a configured default was used.
    Default,
}

#[derive(Debug, Clone)]
pub struct DetectedField {
    pub value: String,
    pub source: Source,
}

/// The `{project, session, agentId}` triple handlers are enriched with
/// before dispatch (spec §4.6).
#[derive(Debug, Clone)]
pub struct DetectedContext {
    pub project_id: Option<DetectedField>,
    pub session_id: Option<DetectedField>,
    pub agent_id: DetectedField,
}

/// Environment-specific detection glue. The core only needs a synchronous
/// probe of the current process state; how that's obtained (reading `.git`,
/// env vars, a session file) is left to the embedder.
pub trait ContextSource: Send + Sync {
    fn detect_project_id(&self) -> Option<String>;
    fn detect_session_id(&self) -> Option<String>;
}

/// A source that never detects anything, used when no embedder-specific
/// probing is configured; every field falls back to `Default`.
#[derive(Default)]
pub struct NullContextSource;

impl ContextSource for NullContextSource {
    fn detect_project_id(&self) -> Option<String> {
        None
    }

    fn detect_session_id(&self) -> Option<String> {
        None
    }
}

struct CacheEntry {
    context: DetectedContext,
    expires_at: Instant,
}

/// Detects and caches the context triple. `cache_ttl` mirrors
/// `autoContext.cacheTTLMs` (spec §6.3); a `refresh()` clears then
/// re-detects so a second call after auto-session creation observes the
/// new session (spec §4.6).
pub struct ContextDetector {
    source: Box<dyn ContextSource>,
    default_agent_id: String,
    cache_ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
}

impl ContextDetector {
    #[must_use]
    pub fn new(source: Box<dyn ContextSource>, default_agent_id: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            source,
            default_agent_id: default_agent_id.into(),
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// Detect the context triple, serving a cached value when still fresh.
    #[must_use]
    pub fn detect(&self) -> DetectedContext {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.as_ref() {
            if entry.expires_at > Instant::now() {
                return entry.context.clone();
            }
        }
        let context = self.detect_fresh();
        *cache = Some(CacheEntry {
            context: context.clone(),
            expires_at: Instant::now() + self.cache_ttl,
        });
        context
    }

    fn detect_fresh(&self) -> DetectedContext {
        let project_id = self.source.detect_project_id().map(|v| DetectedField {
            value: v,
            source: Source::Detected,
        });
        let session_id = self.source.detect_session_id().map(|v| DetectedField {
            value: v,
            source: Source::Detected,
        });
        DetectedContext {
            project_id,
            session_id,
            agent_id: DetectedField {
                value: self.default_agent_id.clone(),
                source: Source::Default,
            },
        }
    }

    /// Explicitly clear the cache (spec §4.6 "explicitly clearable").
    pub fn clear(&self) {
        *self.cache.lock() = None;
    }

    /// Clear then re-detect (spec §4.6 `refresh` operation).
    #[must_use]
    pub fn refresh(&self) -> DetectedContext {
        self.clear();
        self.detect()
    }
}

/// Typed parameters a handler receives after enrichment (spec §4.6
/// `enrichParams`).
#[derive(Debug, Clone, Default)]
pub struct EnrichedParams {
    pub project_id: Option<String>,
    pub session_id: Option<String>,
    pub agent_id: Option<String>,
    pub extra: HashMap<String, String>,
}

/// Fill in `projectId`/`sessionId`/`agentId` on `params` from detection,
/// preferring any value the caller already supplied (spec §4.6: "handlers
/// receive `projectId`/`sessionId`/`agentId` even when the client omits
/// them").
#[must_use]
pub fn enrich_params(mut params: EnrichedParams, detected: &DetectedContext) -> EnrichedParams {
    if params.project_id.is_none() {
        params.project_id = detected.project_id.as_ref().map(|f| f.value.clone());
    }
    if params.session_id.is_none() {
        params.session_id = detected.session_id.as_ref().map(|f| f.value.clone());
    }
    if params.agent_id.is_none() {
        params.agent_id = Some(detected.agent_id.value.clone());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: std::sync::Arc<AtomicUsize>,
    }

    impl ContextSource for CountingSource {
        fn detect_project_id(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some("proj-1".to_string())
        }

        fn detect_session_id(&self) -> Option<String> {
            Some("sess-1".to_string())
        }
    }

    #[test]
    fn cached_detection_does_not_reprobe_within_ttl() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let source = CountingSource { calls: calls.clone() };
        let detector = ContextDetector::new(Box::new(source), "agent-1", Duration::from_secs(60));
        detector.detect();
        detector.detect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refresh_clears_cache_and_redetects() {
        struct FlakySource {
            toggled: std::sync::atomic::AtomicBool,
        }
        impl ContextSource for FlakySource {
            fn detect_project_id(&self) -> Option<String> {
                None
            }
            fn detect_session_id(&self) -> Option<String> {
                if self.toggled.fetch_or(true, Ordering::SeqCst) {
                    Some("sess-after".to_string())
                } else {
                    None
                }
            }
        }
        let detector = ContextDetector::new(
            Box::new(FlakySource { toggled: std::sync::atomic::AtomicBool::new(false) }),
            "agent-1",
            Duration::from_secs(60),
        );
        let first = detector.detect();
        assert!(first.session_id.is_none());
        let refreshed = detector.refresh();
        assert_eq!(refreshed.session_id.unwrap().value, "sess-after");
    }

    #[test]
    fn enrich_prefers_caller_supplied_values() {
        let detected = DetectedContext {
            project_id: Some(DetectedField { value: "detected-proj".into(), source: Source::Detected }),
            session_id: None,
            agent_id: DetectedField { value: "default-agent".into(), source: Source::Default },
        };
        let params = EnrichedParams {
            project_id: Some("explicit-proj".into()),
            ..Default::default()
        };
        let enriched = enrich_params(params, &detected);
        assert_eq!(enriched.project_id.unwrap(), "explicit-proj");
        assert_eq!(enriched.agent_id.unwrap(), "default-agent");
    }
}
