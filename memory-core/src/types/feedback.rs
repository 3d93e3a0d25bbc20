//! Classification learning state (spec §3 `ClassificationFeedback`,
//! `PatternConfidence`; spec §4.3.1 learning loop).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Forced,
    Regex,
    Llm,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifiedType {
    Guideline,
    Knowledge,
    Tool,
}

impl std::fmt::Display for ClassifiedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassifiedType::Guideline => "guideline",
            ClassifiedType::Knowledge => "knowledge",
            ClassifiedType::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

/// Append-only log of classifier corrections, used to adjust pattern
/// weights (spec §3, §4.3.1 learning loop).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationFeedback {
    pub id: Uuid,
    pub text_hash: u64,
    pub predicted: ClassifiedType,
    pub actual: ClassifiedType,
    pub method: ClassificationMethod,
    pub confidence: f64,
    pub was_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// The learned multiplier applied on top of a regex pattern's static
/// weight (spec glossary "Pattern confidence").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfidence {
    pub pattern_id: String,
    pub pattern_type: ClassifiedType,
    pub base_weight: f64,
    pub feedback_multiplier: f64,
    pub total_matches: u64,
    pub correct_matches: u64,
    pub incorrect_matches: u64,
    /// When `feedback_multiplier` was last nudged; drives the linear decay
    /// back toward 1.0 described in spec §4.3.1 ("feedback older than
    /// `feedbackDecayDays` contributes linearly decayed weight").
    pub last_feedback_at: DateTime<Utc>,
}

impl PatternConfidence {
    #[must_use]
    pub fn new(pattern_id: impl Into<String>, pattern_type: ClassifiedType, base_weight: f64) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            pattern_type,
            base_weight,
            feedback_multiplier: 1.0,
            total_matches: 0,
            correct_matches: 0,
            incorrect_matches: 0,
            last_feedback_at: Utc::now(),
        }
    }

    /// Effective contribution of a single match at instant `at`:
    /// `base_weight * decayed_multiplier`, where the multiplier's distance
    /// from 1.0 decays linearly to zero over `decay_days` since the last
    /// feedback nudge (spec §4.3.1 feedback decay).
    #[must_use]
    pub fn effective_weight_at(&self, at: DateTime<Utc>, decay_days: i64) -> f64 {
        self.base_weight * self.decayed_multiplier(at, decay_days)
    }

    #[must_use]
    pub fn decayed_multiplier(&self, at: DateTime<Utc>, decay_days: i64) -> f64 {
        if decay_days <= 0 {
            return self.feedback_multiplier;
        }
        let age_days = (at - self.last_feedback_at).num_seconds() as f64 / 86_400.0;
        let decay_factor = (1.0 - age_days / decay_days as f64).clamp(0.0, 1.0);
        1.0 + (self.feedback_multiplier - 1.0) * decay_factor
    }
}
