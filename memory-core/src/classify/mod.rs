//! Hybrid pattern/LM text classifier (spec §4.3.1) plus experience-trigger
//! detection (spec §4.3.2). Classification precedes the capture pipeline in
//! the dependency order (spec §2): `capture` calls into this module, never
//! the reverse.

pub mod cache;
pub mod catalog;
pub mod trigger;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extraction::LmProvider;
use crate::storage::Database;
use crate::types::{ClassificationConfig, ClassificationFeedback, ClassificationMethod, ClassifiedType, PatternConfidence};

use cache::{ClassifyCache, ClassifyCacheKey};
use catalog::Catalog;

#[must_use]
fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// The classifier's typed decision (spec §4.3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classified_type: ClassifiedType,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub reasoning: Option<String>,
    /// Whether a learned `feedbackMultiplier` away from 1.0 contributed to
    /// this result (spec §8 scenario 3: "shows `adjustedByFeedback=true`").
    pub adjusted_by_feedback: bool,
}

struct PatternVote {
    pattern_type: ClassifiedType,
    weighted_score: f64,
    adjusted: bool,
    rule_ids: Vec<&'static str>,
}

/// The hybrid classifier: pattern stage, optional LM stage, forced mode,
/// cache, and the feedback learning loop.
pub struct Classifier {
    db: Arc<Database>,
    catalog: Catalog,
    config: ClassificationConfig,
    lm: Option<Arc<dyn LmProvider>>,
    cache: ClassifyCache,
}

impl Classifier {
    #[must_use]
    pub fn new(db: Arc<Database>, config: ClassificationConfig, lm: Option<Arc<dyn LmProvider>>) -> Self {
        let cache = ClassifyCache::new(config.cache_size, Duration::from_secs(config.cache_ttl_secs));
        Self {
            db,
            catalog: Catalog::default_catalog(),
            config,
            lm,
            cache,
        }
    }

    /// Classify `text`. When `force_type` is set, returns it verbatim with
    /// confidence 1.0 and method `forced` (spec P-classify-forced), and
    /// records a correction if the non-forced pipeline would have disagreed.
    pub async fn classify(&self, text: &str, force_type: Option<ClassifiedType>) -> Result<ClassificationResult> {
        if let Some(forced) = force_type {
            let unforced = self.classify_unforced(text).await?;
            if unforced.classified_type != forced {
                self.record_correction(text, unforced.classified_type, forced, unforced.method, unforced.confidence);
            }
            return Ok(ClassificationResult {
                classified_type: forced,
                confidence: 1.0,
                method: ClassificationMethod::Forced,
                reasoning: None,
                adjusted_by_feedback: false,
            });
        }

        let key = ClassifyCacheKey {
            text_hash: hash_text(text),
            prefer_llm: self.config.prefer_llm,
        };
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }

        let result = self.classify_unforced(text).await?;
        self.cache.put(key, result.clone());
        Ok(result)
    }

    async fn classify_unforced(&self, text: &str) -> Result<ClassificationResult> {
        let pattern_vote = self.pattern_stage(text);

        let should_try_llm = self.lm.as_ref().is_some_and(|lm| lm.is_available())
            && (self.config.prefer_llm
                || pattern_vote
                    .as_ref()
                    .map_or(true, |v| v.weighted_score < self.config.low_confidence_threshold));

        if should_try_llm {
            if let Some(lm) = &self.lm {
                if let Ok(decision) = lm.classify(text).await {
                    return Ok(ClassificationResult {
                        classified_type: decision.classified_type,
                        confidence: decision.confidence,
                        method: ClassificationMethod::Llm,
                        reasoning: decision.reasoning,
                        adjusted_by_feedback: false,
                    });
                }
                // LM call failed (unavailable/timeout): fall back to the
                // pattern result per spec §4.3.1.
            }
        }

        Ok(match pattern_vote {
            Some(vote) => ClassificationResult {
                classified_type: vote.pattern_type,
                confidence: vote.weighted_score.clamp(0.0, 1.0),
                method: ClassificationMethod::Regex,
                reasoning: Some(format!("matched patterns: {}", vote.rule_ids.join(", "))),
                adjusted_by_feedback: vote.adjusted,
            },
            None => ClassificationResult {
                classified_type: ClassifiedType::Knowledge,
                confidence: 0.3,
                method: ClassificationMethod::Fallback,
                reasoning: Some("no pattern matched".to_string()),
                adjusted_by_feedback: false,
            },
        })
    }

    /// Score every matched pattern, grouped by the type it votes for, and
    /// return the winning type's effective share of total weight as its
    /// confidence (spec §4.3.1: "Competing matches across types reduce
    /// confidence; multiple concordant matches boost it" — the share
    /// formula below satisfies both: extra same-type matches raise the
    /// numerator, extra other-type matches raise the denominator).
    fn pattern_stage(&self, text: &str) -> Option<PatternVote> {
        let matched = self.catalog.matches(text);
        if matched.is_empty() {
            return None;
        }

        let now = chrono::Utc::now();
        let mut totals: std::collections::HashMap<ClassifiedType, f64> = std::collections::HashMap::new();
        let mut adjusted_any = false;
        let mut rule_ids_by_type: std::collections::HashMap<ClassifiedType, Vec<&'static str>> = std::collections::HashMap::new();

        for rule in &matched {
            let confidence = self.db.get_pattern_confidence(rule.id);
            let weight = match &confidence {
                Some(pc) => {
                    let decayed = pc.decayed_multiplier(now, self.config.feedback_decay_days);
                    if (decayed - 1.0).abs() > f64::EPSILON {
                        adjusted_any = true;
                    }
                    rule.base_weight * decayed
                }
                None => rule.base_weight,
            };
            *totals.entry(rule.pattern_type).or_insert(0.0) += weight;
            rule_ids_by_type.entry(rule.pattern_type).or_default().push(rule.id);
        }

        let (winner, winner_total) = totals
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal).then(b.0.cmp(a.0).reverse()))
            .map(|(t, w)| (*t, *w))?;
        let total_all: f64 = totals.values().sum();
        let confidence = if total_all > 0.0 { winner_total / total_all } else { 0.0 };

        Some(PatternVote {
            pattern_type: winner,
            weighted_score: confidence,
            adjusted: adjusted_any,
            rule_ids: rule_ids_by_type.remove(&winner).unwrap_or_default(),
        })
    }

    /// Append a `ClassificationFeedback` row and nudge every pattern that
    /// matched `text` toward (or away from) its learned bound (spec §4.3.1
    /// learning loop, invariant P-classify-learn).
    pub fn record_correction(&self, text: &str, predicted: ClassifiedType, actual: ClassifiedType, method: ClassificationMethod, confidence: f64) {
        let was_correct = predicted == actual;
        self.db.record_feedback(ClassificationFeedback {
            id: uuid::Uuid::new_v4(),
            text_hash: hash_text(text),
            predicted,
            actual,
            method,
            confidence,
            was_correct,
            created_at: chrono::Utc::now(),
        });

        let boost = self.config.max_pattern_boost;
        let penalty = self.config.max_pattern_penalty;
        let rate = self.config.learning_rate;

        for rule in self.catalog.matches(text) {
            let mut pc = self
                .db
                .get_pattern_confidence(rule.id)
                .unwrap_or_else(|| PatternConfidence::new(rule.id, rule.pattern_type, rule.base_weight));
            pc.total_matches += 1;
            if was_correct {
                pc.correct_matches += 1;
                let ceiling = 1.0 + boost;
                pc.feedback_multiplier += rate * (ceiling - pc.feedback_multiplier);
                pc.feedback_multiplier = pc.feedback_multiplier.min(ceiling);
            } else {
                pc.incorrect_matches += 1;
                let floor = 1.0 - penalty;
                pc.feedback_multiplier -= rate * (pc.feedback_multiplier - floor);
                pc.feedback_multiplier = pc.feedback_multiplier.max(floor);
            }
            pc.last_feedback_at = chrono::Utc::now();
            self.db.put_pattern_confidence(pc);
        }

        self.cache.invalidate_text(hash_text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::MockLmProvider;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(Database::new()), ClassificationConfig::default(), None)
    }

    #[tokio::test]
    async fn forced_mode_is_never_cached_and_always_full_confidence() {
        let c = classifier();
        let result = c.classify("whatever text", Some(ClassifiedType::Knowledge)).await.unwrap();
        assert_eq!(result.classified_type, ClassifiedType::Knowledge);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.method, ClassificationMethod::Forced);
    }

    #[tokio::test]
    async fn guideline_pattern_classifies_above_high_confidence() {
        let c = classifier();
        let result = c.classify("Rule: always use X", None).await.unwrap();
        assert_eq!(result.classified_type, ClassifiedType::Guideline);
        assert!(result.confidence >= 0.6);
        assert_eq!(result.method, ClassificationMethod::Regex);
    }

    #[tokio::test]
    async fn forced_divergence_is_recorded_and_future_classification_reflects_feedback() {
        let c = classifier();
        let first = c.classify("Rule: always use X", None).await.unwrap();
        assert_eq!(first.classified_type, ClassifiedType::Guideline);

        c.classify("Rule: always use X", Some(ClassifiedType::Knowledge)).await.unwrap();
        assert!(!c.db.all_feedback().is_empty());

        let second = c.classify("Rule: always use X", None).await.unwrap();
        assert!(second.adjusted_by_feedback);
    }

    #[tokio::test]
    async fn low_confidence_pattern_triggers_llm_fallback() {
        let lm = Arc::new(MockLmProvider::new());
        let mut config = ClassificationConfig::default();
        config.low_confidence_threshold = 0.99;
        let c = Classifier::new(Arc::new(Database::new()), config, Some(lm));
        // Competing knowledge/tool matches keep pattern confidence below
        // the (deliberately high) 0.99 threshold, so the LLM stage fires.
        let result = c.classify("it is run via the script", None).await.unwrap();
        assert_eq!(result.method, ClassificationMethod::Llm);
    }

    #[tokio::test]
    async fn unavailable_llm_falls_back_to_pattern_result() {
        let lm = Arc::new(MockLmProvider::new());
        lm.set_available(false);
        let mut config = ClassificationConfig::default();
        config.low_confidence_threshold = 0.99;
        let c = Classifier::new(Arc::new(Database::new()), config, Some(lm));
        let result = c.classify("Rule: always use X", None).await.unwrap();
        assert_eq!(result.method, ClassificationMethod::Regex);
    }

    #[tokio::test]
    async fn no_matching_pattern_falls_back() {
        let c = classifier();
        let result = c.classify("zzz qqq xyz", None).await.unwrap();
        assert_eq!(result.method, ClassificationMethod::Fallback);
    }
}
