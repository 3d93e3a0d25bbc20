//! `memory_context` tool contract (spec §6.1: `get, budget-info, stats,
//! show, refresh`).

use serde::{Deserialize, Serialize};

use crate::error::ToolResult;

pub const VALID_ACTIONS: &[&str] = &["get", "budget-info", "stats", "show", "refresh"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextActionParam {
    Get,
    BudgetInfo,
    Stats,
    Show,
    Refresh,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryContextParams {
    pub action: ContextActionParam,
}

impl Default for ContextActionParam {
    fn default() -> Self {
        ContextActionParam::Get
    }
}

pub enum ContextRequest {
    Get,
    BudgetInfo,
    Stats,
    Show,
    Refresh,
}

impl MemoryContextParams {
    /// No payload fields beyond the action: `memory_context` only ever
    /// reads process-ambient state (spec §4.6), so there is nothing else
    /// to validate at the edge.
    pub fn decode(&self) -> ToolResult<ContextRequest> {
        Ok(match self.action {
            ContextActionParam::Get => ContextRequest::Get,
            ContextActionParam::BudgetInfo => ContextRequest::BudgetInfo,
            ContextActionParam::Stats => ContextRequest::Stats,
            ContextActionParam::Show => ContextRequest::Show,
            ContextActionParam::Refresh => ContextRequest::Refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_action_is_get() {
        let params = MemoryContextParams::default();
        matches!(params.decode().unwrap(), ContextRequest::Get);
    }

    #[test]
    fn refresh_decodes() {
        let params = MemoryContextParams { action: ContextActionParam::Refresh };
        matches!(params.decode().unwrap(), ContextRequest::Refresh);
    }
}
