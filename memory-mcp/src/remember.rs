//! `memory_remember` tool contract (spec §6.1: `{text, forceType?,
//! priority?, tags?}`).

use memory_core::types::EntryType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ToolResult;
use crate::query::EntryTypeParam;
use crate::wire::ScopeParam;

/// `forceType` only ever names a classifiable type; `experience` is an
/// outcome of auto-detection, never a forceable target (spec §4.3.1
/// classifies into `{guideline, knowledge, tool}`; experiences only arise
/// via the trigger redirect of spec §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceTypeParam {
    Guideline,
    Knowledge,
    Tool,
}

impl From<ForceTypeParam> for memory_core::types::ClassifiedType {
    fn from(value: ForceTypeParam) -> Self {
        match value {
            ForceTypeParam::Guideline => memory_core::types::ClassifiedType::Guideline,
            ForceTypeParam::Knowledge => memory_core::types::ClassifiedType::Knowledge,
            ForceTypeParam::Tool => memory_core::types::ClassifiedType::Tool,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRememberParams {
    pub text: String,
    pub scope: ScopeParam,
    pub actor: String,
    #[serde(default)]
    pub force_type: Option<ForceTypeParam>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRememberResponse {
    pub success: bool,
    pub entry_type: EntryTypeParam,
    pub entry_id: Uuid,
    pub confidence: f64,
    pub auto_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

fn to_wire_entry_type(entry_type: EntryType) -> EntryTypeParam {
    match entry_type {
        EntryType::Guideline => EntryTypeParam::Guideline,
        EntryType::Knowledge => EntryTypeParam::Knowledge,
        EntryType::Tool => EntryTypeParam::Tool,
        EntryType::Experience => EntryTypeParam::Experience,
    }
}

impl From<memory_core::capture::RememberResult> for MemoryRememberResponse {
    fn from(result: memory_core::capture::RememberResult) -> Self {
        Self {
            success: true,
            entry_type: to_wire_entry_type(result.entry_type),
            entry_id: result.entry_id,
            confidence: result.confidence,
            auto_detected: result.auto_detected,
            notice: result.notice,
        }
    }
}

impl MemoryRememberParams {
    /// Decode the scope and force-type fields; the `text`/`priority`/`tags`
    /// fields pass through to [`memory_core::capture::CapturePipeline::remember`]
    /// unchanged, which owns their own length/count validation.
    pub fn decode_scope(&self) -> ToolResult<(memory_core::types::Scope, bool)> {
        self.scope.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ScopeTypeParam;

    #[test]
    fn decode_scope_rejects_malformed_scope() {
        let params = MemoryRememberParams {
            text: "t".to_string(),
            scope: ScopeParam { scope_type: ScopeTypeParam::Project, id: None, inherit: false },
            actor: "agent-1".to_string(),
            force_type: None,
            priority: None,
            tags: Vec::new(),
        };
        assert!(params.decode_scope().is_err());
    }
}
