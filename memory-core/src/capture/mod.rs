//! Turn-by-turn capture pipeline (spec §1 item 2, §4.3.2, §4.3.3):
//! classify free text, redirect high-confidence experience cues before
//! classification ever runs, store the result, and sweep conversations for
//! entries the turn-by-turn path missed.

mod sweep;

use std::sync::Arc;

use chrono::Utc;

use crate::classify::trigger::TriggerDetector;
use crate::classify::Classifier;
use crate::constants::size_limits;
use crate::error::{Error, Result};
use crate::repositories::entry_repo::{ExperienceRepository, GuidelineRepository, KnowledgeRepository, ToolRepository};
use crate::storage::Database;
use crate::types::{
    ClassifiedType, EntryHeader, EntryType, Experience, ExperienceOutcome, Guideline, GuidelineCategory, Knowledge, KnowledgeCategory, Scope, Tool,
    ToolCategory, ToolVersion,
};
use crate::validation::{check_len, check_priority};

pub use sweep::{MissedExtractionSweep, SweepOutcome};

/// `forceType` request parameter for `memory_remember` (spec §4.3.1: the
/// classifier accepts an optional forced type).
pub type ForceType = Option<ClassifiedType>;

/// Result of a `memory_remember` call (spec §4.3.2 "auto-stored as
/// experience" notice; §8 scenario 4 `autoDetected`).
#[derive(Debug, Clone)]
pub struct RememberResult {
    pub entry_type: EntryType,
    pub entry_id: uuid::Uuid,
    pub confidence: f64,
    /// Set when the trigger detector redirected this turn to experience
    /// capture ahead of classification (spec §4.3.2).
    pub auto_detected: bool,
    /// Human-readable notice surfaced to the caller on redirect (spec
    /// §4.3.2: "emits a user-visible 'auto-stored as experience' notice").
    pub notice: Option<String>,
}

/// Threshold below which the trigger detector's redirect fires even when
/// the classifier would have produced its own opinion (spec §4.3.2:
/// `classifierConfidence < 0.9`).
const TRIGGER_REDIRECT_CONFIDENCE_CEILING: f64 = 0.9;

/// The `memory_remember` capture pipeline.
pub struct CapturePipeline {
    db: Arc<Database>,
    classifier: Arc<Classifier>,
    triggers: TriggerDetector,
}

impl CapturePipeline {
    #[must_use]
    pub fn new(db: Arc<Database>, classifier: Arc<Classifier>) -> Self {
        Self {
            db,
            classifier,
            triggers: TriggerDetector::new(),
        }
    }

    /// Store `text` under the best-fit type, honoring the trigger-based
    /// experience redirect (spec §4.3.2) ahead of the classifier.
    pub async fn remember(
        &self,
        text: &str,
        scope: Scope,
        actor: &str,
        force_type: ForceType,
        priority: Option<i32>,
        tags: &[String],
    ) -> Result<RememberResult> {
        check_len("text", text, size_limits::CONTENT_MAX_LENGTH)?;

        if force_type.is_none() {
            if let Some(redirected) = self.try_experience_redirect(text, &scope, actor, tags).await? {
                return Ok(redirected);
            }
        }

        let classification = self.classifier.classify(text, force_type).await?;
        let entry_id = match classification.classified_type {
            ClassifiedType::Guideline => self.store_guideline(text, scope, actor, priority, tags)?,
            ClassifiedType::Knowledge => self.store_knowledge(text, scope, actor, classification.confidence, tags)?,
            ClassifiedType::Tool => self.store_tool(text, scope, actor, tags)?,
        };

        let entry_type = match classification.classified_type {
            ClassifiedType::Guideline => EntryType::Guideline,
            ClassifiedType::Knowledge => EntryType::Knowledge,
            ClassifiedType::Tool => EntryType::Tool,
        };

        Ok(RememberResult {
            entry_type,
            entry_id,
            confidence: classification.confidence,
            auto_detected: false,
            notice: None,
        })
    }

    /// Redirect to experience capture when a high-confidence cue fires and
    /// the classifier's own confidence stays below the ceiling (spec
    /// §4.3.2). Returns `None` when the turn should go through normal
    /// classification instead.
    async fn try_experience_redirect(&self, text: &str, scope: &Scope, actor: &str, tags: &[String]) -> Result<Option<RememberResult>> {
        if !self.triggers.has_high_confidence_trigger(text) {
            return Ok(None);
        }
        let classification = self.classifier.classify(text, None).await?;
        if classification.confidence >= TRIGGER_REDIRECT_CONFIDENCE_CEILING {
            return Ok(None);
        }
        let Some(fields) = self.triggers.parse(text) else {
            return Ok(None);
        };

        let category = TriggerDetector::infer_category(&fields);
        let experience = Experience {
            header: EntryHeader::new(scope.clone(), actor),
            title: fields.title,
            scenario: fields.scenario,
            outcome: ExperienceOutcome::Success,
            outcome_detail: fields.outcome,
            category,
            confidence: classification.confidence.max(0.5),
        };
        let repo = ExperienceRepository::new(self.db.clone());
        let created = repo.create(experience, tags)?;
        Ok(Some(RememberResult {
            entry_type: EntryType::Experience,
            entry_id: created.header.id,
            confidence: created.confidence,
            auto_detected: true,
            notice: Some(format!("auto-stored as experience: {}", created.title)),
        }))
    }

    fn store_guideline(&self, text: &str, scope: Scope, actor: &str, priority: Option<i32>, tags: &[String]) -> Result<uuid::Uuid> {
        let priority = priority.unwrap_or(50);
        check_priority(priority)?;
        let name: String = text.chars().take(size_limits::NAME_MAX_LENGTH).collect();
        let guideline = Guideline {
            header: EntryHeader::new(scope, actor),
            name,
            content: text.to_string(),
            category: GuidelineCategory::Other,
            priority,
        };
        let repo = GuidelineRepository::new(self.db.clone());
        Ok(repo.get_or_create(guideline, tags)?.header.id)
    }

    fn store_knowledge(&self, text: &str, scope: Scope, actor: &str, confidence: f64, tags: &[String]) -> Result<uuid::Uuid> {
        let title: String = text.chars().take(size_limits::TITLE_MAX_LENGTH).collect();
        let knowledge = Knowledge {
            header: EntryHeader::new(scope.clone(), actor),
            title: title.clone(),
            content: text.to_string(),
            category: KnowledgeCategory::Fact,
            confidence,
            valid_from: None,
            valid_until: None,
        };
        let repo = KnowledgeRepository::new(self.db.clone());
        match repo.create(knowledge, tags) {
            Ok(k) => Ok(k.header.id),
            Err(Error::UniqueConstraint { .. }) => self
                .db
                .find_knowledge_by_title(&title, &scope)
                .map(|k| k.header.id)
                .ok_or_else(|| Error::internal("race on unique constraint left no row")),
            Err(e) => Err(e),
        }
    }

    fn store_tool(&self, text: &str, scope: Scope, actor: &str, tags: &[String]) -> Result<uuid::Uuid> {
        let name: String = text.chars().take(size_limits::NAME_MAX_LENGTH).collect();
        let tool = Tool {
            header: EntryHeader::new(scope.clone(), actor),
            name: name.clone(),
            description: text.to_string(),
            category: ToolCategory::Cli,
            current_version: ToolVersion {
                version: "1".to_string(),
                description: "initial capture".to_string(),
                created_at: Utc::now(),
            },
        };
        let repo = ToolRepository::new(self.db.clone());
        match repo.create(tool, tags) {
            Ok(t) => Ok(t.header.id),
            Err(Error::UniqueConstraint { .. }) => self
                .db
                .find_tool_by_name(&name, &scope)
                .map(|t| t.header.id)
                .ok_or_else(|| Error::internal("race on unique constraint left no row")),
            Err(e) => Err(e),
        }
    }
}
