//! Wire error shape (spec §6.4 / §7): `{error, code, context?}`.

use std::collections::HashMap;

use memory_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unknown action requested for a known tool (spec §6.1: "Unknown action
/// -> `InvalidActionError` (code `E1002`) with the set of valid actions").
#[derive(Debug, Clone, thiserror::Error, Deserialize, Serialize)]
#[error("invalid action '{action}' for tool '{tool}'")]
pub struct InvalidAction {
    pub tool: String,
    pub action: String,
    pub valid_actions: Vec<String>,
}

/// The error half of every handler's `{success:true, ...} | {error, code,
/// context?}` response (spec §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, Value>>,
}

impl ToolError {
    #[must_use]
    pub fn invalid_action(tool: &str, action: &str, valid_actions: &[&str]) -> Self {
        let mut context = HashMap::new();
        context.insert("tool".to_string(), Value::String(tool.to_string()));
        context.insert("action".to_string(), Value::String(action.to_string()));
        context.insert(
            "validActions".to_string(),
            Value::Array(valid_actions.iter().map(|a| Value::String((*a).to_string())).collect()),
        );
        Self {
            error: format!("invalid action '{action}' for tool '{tool}'"),
            code: "E1002",
            context: Some(context),
        }
    }
}

impl From<CoreError> for ToolError {
    fn from(err: CoreError) -> Self {
        let code = err.code();
        let context = match &err {
            CoreError::RateLimited { retry_after_ms } => {
                let mut ctx = HashMap::new();
                ctx.insert("retryAfterMs".to_string(), Value::from(*retry_after_ms));
                Some(ctx)
            }
            CoreError::SizeLimitExceeded { limit, actual, unit, .. } => {
                let mut ctx = HashMap::new();
                ctx.insert("limit".to_string(), Value::from(*limit));
                ctx.insert("actual".to_string(), Value::from(*actual));
                ctx.insert("unit".to_string(), Value::String(unit.clone()));
                Some(ctx)
            }
            _ => None,
        };
        Self {
            error: err.to_string(),
            code,
            context,
        }
    }
}

/// Result type every tool handler contract is expressed in.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_not_found_maps_to_stable_code() {
        let err = ToolError::from(CoreError::not_found("x"));
        assert_eq!(err.code, "E1100");
    }

    #[test]
    fn rate_limited_carries_retry_after_in_context() {
        let err = ToolError::from(CoreError::RateLimited { retry_after_ms: 500 });
        assert_eq!(err.code, "E2000");
        assert_eq!(err.context.unwrap().get("retryAfterMs").unwrap(), &Value::from(500));
    }

    #[test]
    fn invalid_action_lists_valid_actions() {
        let err = ToolError::invalid_action("memory_query", "bogus", &["search", "list", "related"]);
        assert_eq!(err.code, "E1002");
        let ctx = err.context.unwrap();
        assert_eq!(ctx.get("action").unwrap(), &Value::String("bogus".to_string()));
    }
}
