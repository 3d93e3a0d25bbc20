//! `memory_guideline` / `memory_knowledge` / `memory_tool` /
//! `memory_experience` tool contracts (spec §6.1 CRUD: `add|get|list|update|
//! deactivate|delete`).
//!
//! Each tool decodes into a typed request enum carrying only what its
//! action needs. `update` decodes into a patch (id plus the optional fields
//! being changed) rather than a full entry, since assembling the final
//! entry requires reading the current row first — that fetch-then-merge
//! step belongs to the handler wiring this crate deliberately leaves out
//! (spec §9: "this spec fixes the contracts but not the framing").

use memory_core::repositories::{EntryFilter, Page};
use memory_core::types::{
    EntryId, Experience, ExperienceOutcome, Guideline, GuidelineCategory, Knowledge,
    KnowledgeCategory, Tool, ToolCategory, ToolVersion,
};
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};
use crate::wire::{PageParam, ScopeParam};

pub const VALID_ACTIONS: &[&str] = &["add", "get", "list", "update", "deactivate", "delete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryActionParam {
    Add,
    Get,
    List,
    Update,
    Deactivate,
    Delete,
}

fn missing_field(tool: &str, field: &str) -> ToolError {
    ToolError {
        error: format!("{tool}: '{field}' is required for this action"),
        code: "E1000",
        context: None,
    }
}

// ---- Guideline ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidelineCategoryParam {
    Security,
    CodeStyle,
    Testing,
    Performance,
    Workflow,
    Other,
}

impl From<GuidelineCategoryParam> for GuidelineCategory {
    fn from(value: GuidelineCategoryParam) -> Self {
        match value {
            GuidelineCategoryParam::Security => GuidelineCategory::Security,
            GuidelineCategoryParam::CodeStyle => GuidelineCategory::CodeStyle,
            GuidelineCategoryParam::Testing => GuidelineCategory::Testing,
            GuidelineCategoryParam::Performance => GuidelineCategory::Performance,
            GuidelineCategoryParam::Workflow => GuidelineCategory::Workflow,
            GuidelineCategoryParam::Other => GuidelineCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryGuidelineParams {
    pub action: EntryActionParam,
    pub scope: ScopeParam,
    pub actor: String,
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<GuidelineCategoryParam>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub page: PageParam,
}

pub struct GuidelinePatch {
    pub id: EntryId,
    pub name: Option<String>,
    pub content: Option<String>,
    pub category: Option<GuidelineCategory>,
    pub priority: Option<i32>,
}

pub enum GuidelineRequest {
    Add(Guideline, Vec<String>),
    Get(EntryId),
    List(EntryFilter, Page),
    Update(GuidelinePatch),
    Deactivate(EntryId),
    Delete(EntryId),
}

impl MemoryGuidelineParams {
    pub fn decode(&self) -> ToolResult<GuidelineRequest> {
        let (scope, _inherit) = self.scope.decode()?;
        match self.action {
            EntryActionParam::Add => {
                let name = self.name.clone().ok_or_else(|| missing_field("memory_guideline", "name"))?;
                let content =
                    self.content.clone().ok_or_else(|| missing_field("memory_guideline", "content"))?;
                let category = self.category.map(Into::into).unwrap_or(GuidelineCategory::Other);
                let priority = self.priority.unwrap_or(50);
                let header = memory_core::types::EntryHeader::new(scope, self.actor.clone());
                Ok(GuidelineRequest::Add(Guideline { header, name, content, category, priority }, self.tags.clone()))
            }
            EntryActionParam::Get => Ok(GuidelineRequest::Get(
                self.id.ok_or_else(|| missing_field("memory_guideline", "id"))?,
            )),
            EntryActionParam::List => {
                let filter = EntryFilter { scope: Some(scope), include_inactive: self.include_inactive };
                Ok(GuidelineRequest::List(filter, self.page.decode()))
            }
            EntryActionParam::Update => {
                let id = self.id.ok_or_else(|| missing_field("memory_guideline", "id"))?;
                Ok(GuidelineRequest::Update(GuidelinePatch {
                    id,
                    name: self.name.clone(),
                    content: self.content.clone(),
                    category: self.category.map(Into::into),
                    priority: self.priority,
                }))
            }
            EntryActionParam::Deactivate => Ok(GuidelineRequest::Deactivate(
                self.id.ok_or_else(|| missing_field("memory_guideline", "id"))?,
            )),
            EntryActionParam::Delete => Ok(GuidelineRequest::Delete(
                self.id.ok_or_else(|| missing_field("memory_guideline", "id"))?,
            )),
        }
    }
}

// ---- Knowledge ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeCategoryParam {
    Decision,
    Fact,
    Context,
    Reference,
    Architecture,
}

impl From<KnowledgeCategoryParam> for KnowledgeCategory {
    fn from(value: KnowledgeCategoryParam) -> Self {
        match value {
            KnowledgeCategoryParam::Decision => KnowledgeCategory::Decision,
            KnowledgeCategoryParam::Fact => KnowledgeCategory::Fact,
            KnowledgeCategoryParam::Context => KnowledgeCategory::Context,
            KnowledgeCategoryParam::Reference => KnowledgeCategory::Reference,
            KnowledgeCategoryParam::Architecture => KnowledgeCategory::Architecture,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryKnowledgeParams {
    pub action: EntryActionParam,
    pub scope: ScopeParam,
    pub actor: String,
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<KnowledgeCategoryParam>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub valid_from: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub page: PageParam,
}

pub struct KnowledgePatch {
    pub id: EntryId,
    pub content: Option<String>,
    pub confidence: Option<f64>,
    pub valid_from: Option<chrono::DateTime<chrono::Utc>>,
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
}

pub enum KnowledgeRequest {
    Add(Knowledge, Vec<String>),
    Get(EntryId),
    List(EntryFilter, Page),
    Update(KnowledgePatch),
    Deactivate(EntryId),
    Delete(EntryId),
}

impl MemoryKnowledgeParams {
    pub fn decode(&self) -> ToolResult<KnowledgeRequest> {
        let (scope, _inherit) = self.scope.decode()?;
        match self.action {
            EntryActionParam::Add => {
                let title = self.title.clone().ok_or_else(|| missing_field("memory_knowledge", "title"))?;
                let content =
                    self.content.clone().ok_or_else(|| missing_field("memory_knowledge", "content"))?;
                let category = self.category.map(Into::into).unwrap_or(KnowledgeCategory::Fact);
                let confidence = self.confidence.unwrap_or(0.8);
                let header = memory_core::types::EntryHeader::new(scope, self.actor.clone());
                Ok(KnowledgeRequest::Add(
                    Knowledge {
                        header,
                        title,
                        content,
                        category,
                        confidence,
                        valid_from: self.valid_from,
                        valid_until: self.valid_until,
                    },
                    self.tags.clone(),
                ))
            }
            EntryActionParam::Get => Ok(KnowledgeRequest::Get(
                self.id.ok_or_else(|| missing_field("memory_knowledge", "id"))?,
            )),
            EntryActionParam::List => {
                let filter = EntryFilter { scope: Some(scope), include_inactive: self.include_inactive };
                Ok(KnowledgeRequest::List(filter, self.page.decode()))
            }
            EntryActionParam::Update => {
                let id = self.id.ok_or_else(|| missing_field("memory_knowledge", "id"))?;
                Ok(KnowledgeRequest::Update(KnowledgePatch {
                    id,
                    content: self.content.clone(),
                    confidence: self.confidence,
                    valid_from: self.valid_from,
                    valid_until: self.valid_until,
                }))
            }
            EntryActionParam::Deactivate => Ok(KnowledgeRequest::Deactivate(
                self.id.ok_or_else(|| missing_field("memory_knowledge", "id"))?,
            )),
            EntryActionParam::Delete => Ok(KnowledgeRequest::Delete(
                self.id.ok_or_else(|| missing_field("memory_knowledge", "id"))?,
            )),
        }
    }
}

// ---- Tool ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategoryParam {
    Mcp,
    Cli,
    Function,
    Api,
}

impl From<ToolCategoryParam> for ToolCategory {
    fn from(value: ToolCategoryParam) -> Self {
        match value {
            ToolCategoryParam::Mcp => ToolCategory::Mcp,
            ToolCategoryParam::Cli => ToolCategory::Cli,
            ToolCategoryParam::Function => ToolCategory::Function,
            ToolCategoryParam::Api => ToolCategory::Api,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryToolParams {
    pub action: EntryActionParam,
    pub scope: ScopeParam,
    pub actor: String,
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<ToolCategoryParam>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub page: PageParam,
}

pub struct ToolPatch {
    pub id: EntryId,
    pub version: Option<String>,
    pub description: Option<String>,
}

pub enum ToolRequest {
    Add(Tool, Vec<String>),
    Get(EntryId),
    List(EntryFilter, Page),
    /// Tools version rather than overwrite in place (spec §3: "tools carry
    /// an explicit version chain"); an update with a `version` becomes a
    /// new version entry, leaving prior versions intact.
    Update(ToolPatch),
    Deactivate(EntryId),
    Delete(EntryId),
}

impl MemoryToolParams {
    pub fn decode(&self) -> ToolResult<ToolRequest> {
        let (scope, _inherit) = self.scope.decode()?;
        match self.action {
            EntryActionParam::Add => {
                let name = self.name.clone().ok_or_else(|| missing_field("memory_tool", "name"))?;
                let description = self
                    .description
                    .clone()
                    .ok_or_else(|| missing_field("memory_tool", "description"))?;
                let category = self.category.map(Into::into).unwrap_or(ToolCategory::Function);
                let version = self.version.clone().unwrap_or_else(|| "1.0.0".to_string());
                let header = memory_core::types::EntryHeader::new(scope, self.actor.clone());
                let current_version =
                    ToolVersion { version, description: description.clone(), created_at: header.created_at };
                Ok(ToolRequest::Add(
                    Tool { header, name, description, category, current_version },
                    self.tags.clone(),
                ))
            }
            EntryActionParam::Get => Ok(ToolRequest::Get(self.id.ok_or_else(|| missing_field("memory_tool", "id"))?)),
            EntryActionParam::List => {
                let filter = EntryFilter { scope: Some(scope), include_inactive: self.include_inactive };
                Ok(ToolRequest::List(filter, self.page.decode()))
            }
            EntryActionParam::Update => {
                let id = self.id.ok_or_else(|| missing_field("memory_tool", "id"))?;
                Ok(ToolRequest::Update(ToolPatch { id, version: self.version.clone(), description: self.description.clone() }))
            }
            EntryActionParam::Deactivate => {
                Ok(ToolRequest::Deactivate(self.id.ok_or_else(|| missing_field("memory_tool", "id"))?))
            }
            EntryActionParam::Delete => Ok(ToolRequest::Delete(self.id.ok_or_else(|| missing_field("memory_tool", "id"))?)),
        }
    }
}

// ---- Experience ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceOutcomeParam {
    Success,
    Partial,
    Failure,
    Abandoned,
}

impl From<ExperienceOutcomeParam> for ExperienceOutcome {
    fn from(value: ExperienceOutcomeParam) -> Self {
        match value {
            ExperienceOutcomeParam::Success => ExperienceOutcome::Success,
            ExperienceOutcomeParam::Partial => ExperienceOutcome::Partial,
            ExperienceOutcomeParam::Failure => ExperienceOutcome::Failure,
            ExperienceOutcomeParam::Abandoned => ExperienceOutcome::Abandoned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryExperienceParams {
    pub action: EntryActionParam,
    pub scope: ScopeParam,
    pub actor: String,
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub outcome: Option<ExperienceOutcomeParam>,
    #[serde(default)]
    pub outcome_detail: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub page: PageParam,
}

pub struct ExperiencePatch {
    pub id: EntryId,
    pub outcome_detail: Option<String>,
    pub confidence: Option<f64>,
}

pub enum ExperienceRequest {
    Add(Experience, Vec<String>),
    Get(EntryId),
    List(EntryFilter, Page),
    Update(ExperiencePatch),
    Deactivate(EntryId),
    Delete(EntryId),
}

impl MemoryExperienceParams {
    pub fn decode(&self) -> ToolResult<ExperienceRequest> {
        let (scope, _inherit) = self.scope.decode()?;
        match self.action {
            EntryActionParam::Add => {
                let title = self.title.clone().ok_or_else(|| missing_field("memory_experience", "title"))?;
                let scenario =
                    self.scenario.clone().ok_or_else(|| missing_field("memory_experience", "scenario"))?;
                let outcome = self
                    .outcome
                    .map(Into::into)
                    .ok_or_else(|| missing_field("memory_experience", "outcome"))?;
                let header = memory_core::types::EntryHeader::new(scope, self.actor.clone());
                Ok(ExperienceRequest::Add(
                    Experience {
                        header,
                        title,
                        scenario,
                        outcome,
                        outcome_detail: self.outcome_detail.clone().unwrap_or_default(),
                        category: self.category.clone().unwrap_or_default(),
                        confidence: self.confidence.unwrap_or(0.6),
                    },
                    self.tags.clone(),
                ))
            }
            EntryActionParam::Get => {
                Ok(ExperienceRequest::Get(self.id.ok_or_else(|| missing_field("memory_experience", "id"))?))
            }
            EntryActionParam::List => {
                let filter = EntryFilter { scope: Some(scope), include_inactive: self.include_inactive };
                Ok(ExperienceRequest::List(filter, self.page.decode()))
            }
            EntryActionParam::Update => {
                let id = self.id.ok_or_else(|| missing_field("memory_experience", "id"))?;
                Ok(ExperienceRequest::Update(ExperiencePatch {
                    id,
                    outcome_detail: self.outcome_detail.clone(),
                    confidence: self.confidence,
                }))
            }
            EntryActionParam::Deactivate => Ok(ExperienceRequest::Deactivate(
                self.id.ok_or_else(|| missing_field("memory_experience", "id"))?,
            )),
            EntryActionParam::Delete => Ok(ExperienceRequest::Delete(
                self.id.ok_or_else(|| missing_field("memory_experience", "id"))?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ScopeTypeParam;

    fn scope_param() -> ScopeParam {
        ScopeParam { scope_type: ScopeTypeParam::Global, id: None, inherit: false }
    }

    #[test]
    fn guideline_add_without_name_is_rejected() {
        let params = MemoryGuidelineParams {
            action: EntryActionParam::Add,
            scope: scope_param(),
            actor: "agent-1".into(),
            id: None,
            name: None,
            content: Some("c".into()),
            category: None,
            priority: None,
            tags: Vec::new(),
            include_inactive: false,
            page: PageParam::default(),
        };
        assert!(params.decode().is_err());
    }

    #[test]
    fn guideline_add_decodes_into_entry() {
        let params = MemoryGuidelineParams {
            action: EntryActionParam::Add,
            scope: scope_param(),
            actor: "agent-1".into(),
            id: None,
            name: Some("always-lock".into()),
            content: Some("take the lock first".into()),
            category: Some(GuidelineCategoryParam::Workflow),
            priority: Some(70),
            tags: vec!["locking".into()],
            include_inactive: false,
            page: PageParam::default(),
        };
        match params.decode().unwrap() {
            GuidelineRequest::Add(g, tags) => {
                assert_eq!(g.name, "always-lock");
                assert_eq!(g.priority, 70);
                assert_eq!(tags, vec!["locking".to_string()]);
            }
            _ => panic!("expected Add"),
        }
    }

    #[test]
    fn guideline_delete_requires_id() {
        let params = MemoryGuidelineParams {
            action: EntryActionParam::Delete,
            scope: scope_param(),
            actor: "agent-1".into(),
            id: None,
            name: None,
            content: None,
            category: None,
            priority: None,
            tags: Vec::new(),
            include_inactive: false,
            page: PageParam::default(),
        };
        assert!(params.decode().is_err());
    }

    #[test]
    fn experience_add_requires_outcome() {
        let params = MemoryExperienceParams {
            action: EntryActionParam::Add,
            scope: scope_param(),
            actor: "agent-1".into(),
            id: None,
            title: Some("oauth refresh".into()),
            scenario: Some("token expired mid-session".into()),
            outcome: None,
            outcome_detail: None,
            category: None,
            confidence: None,
            tags: Vec::new(),
            include_inactive: false,
            page: PageParam::default(),
        };
        assert!(params.decode().is_err());
    }

    #[test]
    fn tool_update_carries_version_patch() {
        let params = MemoryToolParams {
            action: EntryActionParam::Update,
            scope: scope_param(),
            actor: "agent-1".into(),
            id: Some(EntryId::new_v4()),
            name: None,
            description: Some("bumped".into()),
            category: None,
            version: Some("1.1.0".into()),
            tags: Vec::new(),
            include_inactive: false,
            page: PageParam::default(),
        };
        match params.decode().unwrap() {
            ToolRequest::Update(patch) => assert_eq!(patch.version.as_deref(), Some("1.1.0")),
            _ => panic!("expected Update"),
        }
    }
}
