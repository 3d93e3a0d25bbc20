//! The polymorphic `Entry` unit the query engine retrieves (spec §3).

use crate::types::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque id for any stored entry.
pub type EntryId = Uuid;

/// Which concrete variant an `Entry` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Guideline,
    Knowledge,
    Tool,
    Experience,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryType::Guideline => "guideline",
            EntryType::Knowledge => "knowledge",
            EntryType::Tool => "tool",
            EntryType::Experience => "experience",
        };
        write!(f, "{s}")
    }
}

/// Fields every entry variant shares (spec §3 invariants (b)/(c)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHeader {
    pub id: EntryId,
    pub scope: Scope,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl EntryHeader {
    #[must_use]
    pub fn new(scope: Scope, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidelineCategory {
    Security,
    CodeStyle,
    Testing,
    Performance,
    Workflow,
    Other,
}

/// A prescriptive rule (spec §3 `Guideline`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guideline {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub name: String,
    pub content: String,
    pub category: GuidelineCategory,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeCategory {
    Decision,
    Fact,
    Context,
    Reference,
    Architecture,
}

/// A fact/decision/reference (spec §3 `Knowledge`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Knowledge {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub title: String,
    pub content: String,
    pub category: KnowledgeCategory,
    pub confidence: f64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Knowledge {
    /// Whether this knowledge entry is valid at instant `at` (spec §4.2
    /// `atTime` / `validDuring` filters).
    #[must_use]
    pub fn valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= at) && self.valid_until.is_none_or(|until| at <= until)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Mcp,
    Cli,
    Function,
    Api,
}

/// A command or callable (spec §3 `Tool`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub current_version: ToolVersion,
}

/// One entry in a tool's version chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersion {
    pub version: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceOutcome {
    Success,
    Partial,
    Failure,
    Abandoned,
}

/// A captured post-hoc narrative (spec §3 `Experience`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub title: String,
    pub scenario: String,
    pub outcome: ExperienceOutcome,
    /// Free-text qualifier accompanying `outcome`, e.g. "success - refreshing
    /// tokens" (spec §8 scenario 4).
    pub outcome_detail: String,
    pub category: String,
    pub confidence: f64,
}

/// A fully-owned, type-erased view of an entry used by the query pipeline
/// after the merge stage, when candidates from different variants must be
/// ranked together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryView {
    pub entry_type: EntryType,
    pub id: EntryId,
    pub scope: Scope,
    pub title: String,
    pub content: String,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&Guideline> for EntryView {
    fn from(g: &Guideline) -> Self {
        EntryView {
            entry_type: EntryType::Guideline,
            id: g.header.id,
            scope: g.header.scope.clone(),
            title: g.name.clone(),
            content: g.content.clone(),
            priority: g.priority,
            created_at: g.header.created_at,
            is_active: g.header.is_active,
        }
    }
}

impl From<&Knowledge> for EntryView {
    fn from(k: &Knowledge) -> Self {
        EntryView {
            entry_type: EntryType::Knowledge,
            id: k.header.id,
            scope: k.header.scope.clone(),
            title: k.title.clone(),
            content: k.content.clone(),
            priority: (k.confidence * 100.0) as i32,
            created_at: k.header.created_at,
            is_active: k.header.is_active,
        }
    }
}

impl From<&Tool> for EntryView {
    fn from(t: &Tool) -> Self {
        EntryView {
            entry_type: EntryType::Tool,
            id: t.header.id,
            scope: t.header.scope.clone(),
            title: t.name.clone(),
            content: t.description.clone(),
            priority: 0,
            created_at: t.header.created_at,
            is_active: t.header.is_active,
        }
    }
}

impl From<&Experience> for EntryView {
    fn from(e: &Experience) -> Self {
        EntryView {
            entry_type: EntryType::Experience,
            id: e.header.id,
            scope: e.header.scope.clone(),
            title: e.title.clone(),
            content: format!("{}\n{}", e.scenario, e.outcome_detail),
            priority: (e.confidence * 100.0) as i32,
            created_at: e.header.created_at,
            is_active: e.header.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_validity_window() {
        let mut k = Knowledge {
            header: EntryHeader::new(Scope::global(), "agent-1"),
            title: "t".into(),
            content: "c".into(),
            category: KnowledgeCategory::Fact,
            confidence: 0.9,
            valid_from: None,
            valid_until: None,
        };
        assert!(k.valid_at(Utc::now()));

        k.valid_from = Some(Utc::now() + chrono::Duration::days(1));
        assert!(!k.valid_at(Utc::now()));
    }

    #[test]
    fn entry_view_conversion_preserves_id() {
        let g = Guideline {
            header: EntryHeader::new(Scope::global(), "agent-1"),
            name: "always-lock".into(),
            content: "always take the lock".into(),
            category: GuidelineCategory::Workflow,
            priority: 50,
        };
        let view: EntryView = (&g).into();
        assert_eq!(view.id, g.header.id);
        assert_eq!(view.entry_type, EntryType::Guideline);
    }
}
