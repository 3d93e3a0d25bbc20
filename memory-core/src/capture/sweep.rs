//! Session-end missed-extraction sweep (spec §4.3.3): run an extraction
//! adapter over a conversation's messages and retain the candidates that
//! survive confidence and duplicate filtering.

use std::sync::Arc;
use std::time::Instant;

use crate::constants::DUPLICATE_SIMILARITY;
use crate::embeddings::EmbeddingProvider;
use crate::extraction::{ExtractedCandidate, ExtractionProvider};
use crate::storage::{cosine_similarity, Database};
use crate::types::{ClassifiedType, Scope};

/// Default minimum message count before a sweep is attempted (spec §4.3.3:
/// "filtered to `minMessages`, default 3").
pub const DEFAULT_MIN_MESSAGES: usize = 3;
/// Default per-candidate confidence floor (spec §4.3.3).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Default cap on retained candidates (spec §4.3.3).
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// One candidate the sweep decided to keep.
#[derive(Debug, Clone)]
pub struct MissedEntry {
    pub classified_type: ClassifiedType,
    pub title: String,
    pub content: String,
    pub confidence: f64,
}

/// The sweep's typed result (spec §4.3.3: "returns `{missedEntries,
/// totalExtracted, duplicatesFiltered, belowThresholdCount,
/// processingTimeMs}`... never throws on extractor failure").
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub missed_entries: Vec<MissedEntry>,
    pub total_extracted: usize,
    pub duplicates_filtered: usize,
    pub below_threshold_count: usize,
    pub processing_time_ms: u64,
}

impl SweepOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            missed_entries: Vec::new(),
            total_extracted: 0,
            duplicates_filtered: 0,
            below_threshold_count: 0,
            processing_time_ms: 0,
        }
    }
}

pub struct MissedExtractionSweep {
    db: Arc<Database>,
    extractor: Arc<dyn ExtractionProvider>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    min_messages: usize,
    confidence_threshold: f64,
    max_entries: usize,
}

impl MissedExtractionSweep {
    #[must_use]
    pub fn new(db: Arc<Database>, extractor: Arc<dyn ExtractionProvider>, embedding: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            db,
            extractor,
            embedding,
            min_messages: DEFAULT_MIN_MESSAGES,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, min_messages: usize, confidence_threshold: f64, max_entries: usize) -> Self {
        self.min_messages = min_messages;
        self.confidence_threshold = confidence_threshold;
        self.max_entries = max_entries;
        self
    }

    /// Run the sweep over `messages` in `scope`. Never returns an `Err`:
    /// extractor failures are reported via `SweepOutcome::success = false`
    /// (spec §4.3.3).
    pub async fn run(&self, messages: &[String], scope: &Scope) -> SweepOutcome {
        let started = Instant::now();
        if messages.len() < self.min_messages {
            return SweepOutcome {
                success: true,
                error: None,
                missed_entries: Vec::new(),
                total_extracted: 0,
                duplicates_filtered: 0,
                below_threshold_count: 0,
                processing_time_ms: elapsed_ms(started),
            };
        }

        if !self.extractor.is_available() {
            return SweepOutcome::failed("extraction adapter unavailable");
        }

        let candidates = match self.extractor.extract(messages).await {
            Ok(c) => c,
            Err(e) => return SweepOutcome::failed(e.to_string()),
        };

        let total_extracted = candidates.len();
        let mut below_threshold_count = 0;
        let mut duplicates_filtered = 0;
        let mut missed_entries = Vec::new();

        for candidate in candidates {
            if candidate.confidence < self.confidence_threshold {
                below_threshold_count += 1;
                continue;
            }
            if self.is_duplicate(&candidate, scope).await {
                duplicates_filtered += 1;
                continue;
            }
            missed_entries.push(MissedEntry {
                classified_type: candidate.classified_type,
                title: candidate.title,
                content: candidate.content,
                confidence: candidate.confidence,
            });
            if missed_entries.len() >= self.max_entries {
                break;
            }
        }

        SweepOutcome {
            success: true,
            error: None,
            missed_entries,
            total_extracted,
            duplicates_filtered,
            below_threshold_count,
            processing_time_ms: elapsed_ms(started),
        }
    }

    /// Exact title/slug match, or (when an embedding provider is
    /// available) cosine similarity at or above `DUPLICATE_SIMILARITY`
    /// against any existing active entry of the same type in `scope`.
    async fn is_duplicate(&self, candidate: &ExtractedCandidate, scope: &Scope) -> bool {
        let exact = match candidate.classified_type {
            ClassifiedType::Guideline => self.db.find_guideline_by_name(&candidate.title, scope).is_some(),
            ClassifiedType::Knowledge => self.db.find_knowledge_by_title(&candidate.title, scope).is_some(),
            ClassifiedType::Tool => self.db.find_tool_by_name(&candidate.title, scope).is_some(),
        };
        if exact {
            return true;
        }

        let Some(embedding) = &self.embedding else {
            return false;
        };
        let Ok(vector) = embedding.embed(&candidate.content).await else {
            return false;
        };

        let existing_keys: Vec<String> = match candidate.classified_type {
            ClassifiedType::Guideline => self.db.list_guidelines().iter().map(|g| crate::storage::doc_key(crate::types::EntryType::Guideline, g.header.id)).collect(),
            ClassifiedType::Knowledge => self.db.list_knowledge().iter().map(|k| crate::storage::doc_key(crate::types::EntryType::Knowledge, k.header.id)).collect(),
            ClassifiedType::Tool => self.db.list_tools().iter().map(|t| crate::storage::doc_key(crate::types::EntryType::Tool, t.header.id)).collect(),
        };

        existing_keys
            .iter()
            .filter_map(|key| self.db.get_embedding(key))
            .any(|existing| cosine_similarity(&vector, &existing) >= DUPLICATE_SIMILARITY)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::MockExtractionProvider;

    #[tokio::test]
    async fn fewer_than_min_messages_skips_extraction() {
        let sweep = MissedExtractionSweep::new(Arc::new(Database::new()), Arc::new(MockExtractionProvider::new()), None);
        let outcome = sweep.run(&["one message".to_string()], &Scope::global()).await;
        assert!(outcome.success);
        assert_eq!(outcome.total_extracted, 0);
    }

    #[tokio::test]
    async fn three_qualifying_messages_yield_three_typed_entries() {
        let sweep = MissedExtractionSweep::new(Arc::new(Database::new()), Arc::new(MockExtractionProvider::new()), None);
        let messages = vec![
            "always use prepared statements with PostgreSQL".to_string(),
            "the project uses Zod for schema validation".to_string(),
            "run npm run test:integration before merging".to_string(),
        ];
        let outcome = sweep.run(&messages, &Scope::global()).await;
        assert!(outcome.success);
        assert_eq!(outcome.missed_entries.len(), 3);
    }

    #[tokio::test]
    async fn exact_title_duplicate_is_filtered() {
        let db = Arc::new(Database::new());
        let extractor = Arc::new(MockExtractionProvider::new());
        let messages = vec![
            "always use prepared statements with PostgreSQL".to_string(),
            "the project uses Zod for schema validation".to_string(),
            "run npm run test:integration before merging".to_string(),
        ];
        let candidates = extractor.extract(&messages).await.unwrap();
        let knowledge_candidate = candidates.iter().find(|c| c.classified_type == ClassifiedType::Knowledge).unwrap();
        crate::repositories::entry_repo::KnowledgeRepository::new(db.clone())
            .create(
                crate::types::Knowledge {
                    header: crate::types::EntryHeader::new(Scope::global(), "agent-1"),
                    title: knowledge_candidate.title.clone(),
                    content: knowledge_candidate.content.clone(),
                    category: crate::types::KnowledgeCategory::Fact,
                    confidence: 0.9,
                    valid_from: None,
                    valid_until: None,
                },
                &[],
            )
            .unwrap();

        let sweep = MissedExtractionSweep::new(db, extractor, None);
        let outcome = sweep.run(&messages, &Scope::global()).await;
        assert_eq!(outcome.duplicates_filtered, 1);
        assert_eq!(outcome.missed_entries.len(), 2);
    }

    #[tokio::test]
    async fn extractor_failure_reports_success_false_without_throwing() {
        let extractor = Arc::new(MockExtractionProvider::new());
        extractor.set_available(false);
        let sweep = MissedExtractionSweep::new(Arc::new(Database::new()), extractor, None);
        let messages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = sweep.run(&messages, &Scope::global()).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
