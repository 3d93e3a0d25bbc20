//! Shared wire-shape fragments reused across multiple tool parameter sets
//! (spec §9: "each tool declares a parameter schema... decoding happens
//! once at the edge into a typed request value").

use memory_core::constants::DEFAULT_QUERY_LIMIT;
use memory_core::repositories::Page;
use memory_core::types::{Scope, ScopeType};
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeTypeParam {
    Global,
    Org,
    Project,
    Session,
}

impl From<ScopeTypeParam> for ScopeType {
    fn from(value: ScopeTypeParam) -> Self {
        match value {
            ScopeTypeParam::Global => ScopeType::Global,
            ScopeTypeParam::Org => ScopeType::Org,
            ScopeTypeParam::Project => ScopeType::Project,
            ScopeTypeParam::Session => ScopeType::Session,
        }
    }
}

/// Wire form of a scope reference: `{type, id?, inherit?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeParam {
    #[serde(rename = "type")]
    pub scope_type: ScopeTypeParam,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub inherit: bool,
}

impl ScopeParam {
    /// Decode into a `{Scope, inherit}` pair, validating invariant P-scope
    /// at the edge (global <=> no id) so downstream repositories never see
    /// a malformed scope.
    pub fn decode(&self) -> Result<(Scope, bool), ToolError> {
        let scope_type: ScopeType = self.scope_type.into();
        let scope = match (scope_type, &self.id) {
            (ScopeType::Global, None) => Scope::global(),
            (ScopeType::Global, Some(_)) => {
                return Err(ToolError {
                    error: "global scope must not carry an id".to_string(),
                    code: "E1000",
                    context: None,
                })
            }
            (other, Some(id)) => Scope::new(other, id.clone()),
            (_, None) => {
                return Err(ToolError {
                    error: "non-global scope requires an id".to_string(),
                    code: "E1000",
                    context: None,
                })
            }
        };
        Ok((scope, self.inherit))
    }
}

/// Wire form of pagination (`limit`/`offset`), decoded through
/// [`memory_core::repositories::paginate`]'s clamping rules (spec §8:
/// "`limit = 0` or negative clamps to 1; `limit = MAX_SAFE_INTEGER` clamps
/// to `MAX_QUERY_LIMIT`").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParam {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParam {
    #[must_use]
    pub fn decode(&self) -> Page {
        Page::new(self.limit.unwrap_or(DEFAULT_QUERY_LIMIT as i64), self.offset.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_with_id_is_rejected() {
        let param = ScopeParam { scope_type: ScopeTypeParam::Global, id: Some("x".into()), inherit: false };
        assert!(param.decode().is_err());
    }

    #[test]
    fn project_scope_without_id_is_rejected() {
        let param = ScopeParam { scope_type: ScopeTypeParam::Project, id: None, inherit: false };
        assert!(param.decode().is_err());
    }

    #[test]
    fn valid_project_scope_decodes() {
        let param = ScopeParam { scope_type: ScopeTypeParam::Project, id: Some("p1".into()), inherit: true };
        let (scope, inherit) = param.decode().unwrap();
        assert_eq!(scope.scope_type, ScopeType::Project);
        assert!(inherit);
    }
}
