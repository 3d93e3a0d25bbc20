//! `memory_query` tool contract (spec §6.1: actions `search`, `list`,
//! `related`; params per §4.2).

use chrono::{DateTime, Utc};
use memory_core::query::{QueryAction as CoreQueryAction, QueryRequest, RelatedToFilter, RelationDirection};
use memory_core::types::{EntryId, EntryType};
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};
use crate::wire::{PageParam, ScopeParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryActionParam {
    Search,
    List,
    Related,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTypeParam {
    Guideline,
    Knowledge,
    Tool,
    Experience,
}

impl From<EntryTypeParam> for EntryType {
    fn from(value: EntryTypeParam) -> Self {
        match value {
            EntryTypeParam::Guideline => EntryType::Guideline,
            EntryTypeParam::Knowledge => EntryType::Knowledge,
            EntryTypeParam::Tool => EntryType::Tool,
            EntryTypeParam::Experience => EntryType::Experience,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirectionParam {
    Outgoing,
    Incoming,
    Both,
}

impl From<RelationDirectionParam> for RelationDirection {
    fn from(value: RelationDirectionParam) -> Self {
        match value {
            RelationDirectionParam::Outgoing => RelationDirection::Outgoing,
            RelationDirectionParam::Incoming => RelationDirection::Incoming,
            RelationDirectionParam::Both => RelationDirection::Both,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedToParam {
    pub entry_type: EntryTypeParam,
    pub entry_id: EntryId,
    #[serde(default = "default_direction")]
    pub direction: RelationDirectionParam,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_direction() -> RelationDirectionParam {
    RelationDirectionParam::Both
}

fn default_max_depth() -> usize {
    memory_core::constants::MAX_RELATION_DEPTH
}

/// Wire params for `memory_query` (spec §4.2's consumed shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQueryParams {
    pub action: QueryActionParam,
    #[serde(default)]
    pub search: Option<String>,
    pub scope: ScopeParam,
    #[serde(default)]
    pub types: Vec<EntryTypeParam>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub min_priority: Option<i32>,
    #[serde(default)]
    pub at_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default = "default_true")]
    pub use_fts5: bool,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub semantic_search: bool,
    #[serde(default)]
    pub related_to: Option<RelatedToParam>,
    #[serde(default)]
    pub page: PageParam,
}

fn default_true() -> bool {
    true
}

/// Valid actions for `memory_query`, used to build `InvalidActionError`.
pub const VALID_ACTIONS: &[&str] = &["search", "list", "related"];

impl MemoryQueryParams {
    /// Decode wire params into the core `QueryRequest` (spec §9: "decoding
    /// happens once at the edge into a typed request value").
    pub fn decode(&self) -> ToolResult<QueryRequest> {
        let (scope, inherit) = self.scope.decode()?;
        let action = match self.action {
            QueryActionParam::Search => CoreQueryAction::Search,
            QueryActionParam::List => CoreQueryAction::List,
            QueryActionParam::Related => CoreQueryAction::Related,
        };
        if action == CoreQueryAction::Related && self.related_to.is_none() {
            return Err(ToolError::invalid_action("memory_query", "related", VALID_ACTIONS));
        }
        let types = if self.types.is_empty() {
            vec![EntryType::Guideline, EntryType::Knowledge, EntryType::Tool, EntryType::Experience]
        } else {
            self.types.iter().map(|t| (*t).into()).collect()
        };
        Ok(QueryRequest {
            action,
            search: self.search.clone(),
            scope: memory_core::query::ScopeQuery { scope, inherit },
            types,
            tags: self.tags.clone(),
            min_priority: self.min_priority,
            at_time: self.at_time,
            created_after: self.created_after,
            created_before: self.created_before,
            include_inactive: self.include_inactive,
            use_fts5: self.use_fts5,
            fuzzy: self.fuzzy,
            regex: self.regex.clone(),
            semantic_search: self.semantic_search,
            related_to: self.related_to.as_ref().map(|r| RelatedToFilter {
                entry_type: r.entry_type.into(),
                entry_id: r.entry_id,
                direction: r.direction.into(),
                max_depth: r.max_depth,
            }),
            page: self.page.decode(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ScopeTypeParam;

    fn base_params(action: QueryActionParam) -> MemoryQueryParams {
        MemoryQueryParams {
            action,
            search: Some("x".to_string()),
            scope: ScopeParam { scope_type: ScopeTypeParam::Global, id: None, inherit: false },
            types: Vec::new(),
            tags: Vec::new(),
            min_priority: None,
            at_time: None,
            created_after: None,
            created_before: None,
            include_inactive: false,
            use_fts5: true,
            fuzzy: false,
            regex: None,
            semantic_search: false,
            related_to: None,
            page: PageParam::default(),
        }
    }

    #[test]
    fn related_action_without_related_to_is_invalid() {
        let params = base_params(QueryActionParam::Related);
        let err = params.decode().unwrap_err();
        assert_eq!(err.code, "E1002");
    }

    #[test]
    fn empty_types_defaults_to_all_four() {
        let params = base_params(QueryActionParam::List);
        let decoded = params.decode().unwrap();
        assert_eq!(decoded.types.len(), 4);
    }

    #[test]
    fn search_action_decodes_search_text() {
        let params = base_params(QueryActionParam::Search);
        let decoded = params.decode().unwrap();
        assert_eq!(decoded.search.as_deref(), Some("x"));
    }
}
