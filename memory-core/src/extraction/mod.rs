//! Extraction and language-model capabilities used by the capture pipeline
//! (spec §4.3.1 LM classification fallback, §4.3.3 missed-extraction sweep).
//!
//! Both are narrow interfaces per spec §9: "treat the LM and embedding
//! providers as narrow capabilities with `isAvailable() -> bool` and
//! structured request/response shapes; every caller MUST have a non-LM
//! fallback path." Concrete vendor adapters are out of scope (spec §1);
//! only the trait and a deterministic mock live here, in the style of the
//! teacher's provider traits (`embeddings::provider::EmbeddingProvider`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ClassifiedType;

/// A structured classification decision returned by an LM adapter (spec
/// §4.3.1: "The adapter MUST return a structured `{type, confidence,
/// reasoning?}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmClassification {
    pub classified_type: ClassifiedType,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// Narrow language-model capability consumed by the classifier's optional
/// LM stage.
#[async_trait]
pub trait LmProvider: Send + Sync {
    /// Classify free text into one of the three storable entry types.
    /// A parse failure on the caller's side is NOT this trait's concern;
    /// this method itself returns a typed error only for transport/provider
    /// failures (spec §4.3.1: "any parse failure falls back to the pattern
    /// result").
    async fn classify(&self, text: &str) -> Result<LmClassification>;

    /// Whether the adapter is currently reachable.
    fn is_available(&self) -> bool;
}

/// One candidate entry surfaced by the extraction adapter during a
/// session-end sweep (spec §4.3.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    pub classified_type: ClassifiedType,
    pub title: String,
    pub content: String,
    pub confidence: f64,
}

/// Narrow extraction capability: given a conversation's message text,
/// surface zero or more candidate entries (spec §4.3.3).
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, messages: &[String]) -> Result<Vec<ExtractedCandidate>>;

    fn is_available(&self) -> bool;
}

/// Deterministic mock used where a real LM/extraction backend would sit.
/// Classifies by keyword heuristics and extracts one candidate per message
/// that looks like a rule, fact, or command — enough to exercise the
/// sweep's filtering logic without a network dependency.
pub struct MockLmProvider {
    available: std::sync::atomic::AtomicBool,
}

impl Default for MockLmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLmProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl LmProvider for MockLmProvider {
    async fn classify(&self, text: &str) -> Result<LmClassification> {
        if !self.is_available() {
            return Err(crate::error::Error::DependencyUnavailable {
                dependency: "llm".to_string(),
            });
        }
        let lower = text.to_lowercase();
        let (classified_type, confidence) = if lower.contains("always") || lower.contains("never") || lower.contains("must") {
            (ClassifiedType::Guideline, 0.8)
        } else if lower.contains("run ") || lower.contains("command") || lower.starts_with('`') {
            (ClassifiedType::Tool, 0.75)
        } else {
            (ClassifiedType::Knowledge, 0.65)
        };
        Ok(LmClassification {
            classified_type,
            confidence,
            reasoning: Some("mock keyword heuristic".to_string()),
        })
    }

    fn is_available(&self) -> bool {
        self.available.load(std::sync::atomic::Ordering::SeqCst)
    }
}

pub struct MockExtractionProvider {
    available: std::sync::atomic::AtomicBool,
}

impl Default for MockExtractionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractionProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl ExtractionProvider for MockExtractionProvider {
    async fn extract(&self, messages: &[String]) -> Result<Vec<ExtractedCandidate>> {
        if !self.is_available() {
            return Err(crate::error::Error::DependencyUnavailable {
                dependency: "extraction".to_string(),
            });
        }
        let mut candidates = Vec::new();
        for message in messages {
            let lower = message.to_lowercase();
            let (classified_type, confidence) = if lower.contains("always") || lower.contains("should") {
                (ClassifiedType::Guideline, 0.88)
            } else if lower.contains("run ") || lower.contains("npm ") || lower.contains("cargo ") {
                (ClassifiedType::Tool, 0.86)
            } else if lower.contains("is") || lower.contains("uses") {
                (ClassifiedType::Knowledge, 0.82)
            } else {
                continue;
            };
            let title: String = message.chars().take(60).collect();
            candidates.push(ExtractedCandidate {
                classified_type,
                title,
                content: message.clone(),
                confidence,
            });
        }
        Ok(candidates)
    }

    fn is_available(&self) -> bool {
        self.available.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_lm_returns_dependency_unavailable() {
        let provider = MockLmProvider::new();
        provider.set_available(false);
        assert!(provider.classify("rule text").await.is_err());
    }

    #[tokio::test]
    async fn extraction_skips_messages_with_no_signal() {
        let provider = MockExtractionProvider::new();
        let messages = vec!["hello there".to_string(), "always lock the file first".to_string()];
        let candidates = provider.extract(&messages).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].classified_type, ClassifiedType::Guideline);
    }
}
