//! Scope containment (spec §3 invariant (a), glossary "Scope"/"Inheritance").

use serde::{Deserialize, Serialize};

/// Containment level of an entry or query. `Global` is the only scope with
/// no `scope_id` (spec invariant P-scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Global,
    Org,
    Project,
    Session,
}

impl ScopeType {
    /// Ordinal used to rank scope specificity narrowest-first, matching
    /// spec §4.2 step 5's tie-break ("scope specificity -> createdAt desc
    /// -> id asc").
    #[must_use]
    pub fn specificity(self) -> u8 {
        match self {
            ScopeType::Session => 3,
            ScopeType::Project => 2,
            ScopeType::Org => 1,
            ScopeType::Global => 0,
        }
    }

    /// The immediate parent scope type, if any.
    #[must_use]
    pub fn parent(self) -> Option<ScopeType> {
        match self {
            ScopeType::Session => Some(ScopeType::Project),
            ScopeType::Project => Some(ScopeType::Org),
            ScopeType::Org => Some(ScopeType::Global),
            ScopeType::Global => None,
        }
    }
}

/// A concrete scope: a type plus, for all but `Global`, an id identifying
/// which org/project/session it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: ScopeType,
    pub scope_id: Option<String>,
}

impl Scope {
    #[must_use]
    pub fn global() -> Self {
        Self {
            scope_type: ScopeType::Global,
            scope_id: None,
        }
    }

    #[must_use]
    pub fn new(scope_type: ScopeType, scope_id: impl Into<String>) -> Self {
        let scope_id = scope_id.into();
        if scope_type == ScopeType::Global {
            return Self::global();
        }
        Self {
            scope_type,
            scope_id: Some(scope_id),
        }
    }

    /// Validate invariant P-scope: `scope == global <=> scope_id == None`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self.scope_type {
            ScopeType::Global => self.scope_id.is_none(),
            _ => self.scope_id.is_some(),
        }
    }

    /// Expand this scope to the full ancestor chain, narrowest first,
    /// ending at `global` (spec §4.2 `inherit = true`). `resolver` supplies
    /// the real id of each intermediate ancestor (P-scope requires every
    /// non-global scope to carry a concrete id, so a guessed id would never
    /// match anything and a blank one would match everything); if an id
    /// can't be resolved, the chain stops growing intermediate levels but
    /// still reaches `global`, since that scope needs no id.
    #[must_use]
    pub fn ancestor_chain(&self, resolver: &dyn ScopeResolver) -> Vec<Scope> {
        let mut chain = vec![self.clone()];
        let mut current = self.clone();
        while let Some(parent_type) = current.scope_type.parent() {
            if parent_type == ScopeType::Global {
                chain.push(Scope::global());
                break;
            }
            let Some(current_id) = current.scope_id.as_deref() else { break };
            let Some(parent_id) = resolver.parent_id(current.scope_type, current_id) else {
                chain.push(Scope::global());
                break;
            };
            let parent = Scope::new(parent_type, parent_id);
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }
}

/// Resolves the real id of a scope's immediate containing scope (spec §4.2
/// `inherit = true`, scenario spec.md:274: inheritance must match the
/// *specific* containing org/project, not an arbitrary scope of that type).
/// A bare `Scope` doesn't know its own containment; whoever persists
/// entries also knows which org a project belongs to and which project a
/// session belongs to, and implements this.
pub trait ScopeResolver: Send + Sync {
    /// The id of `scope_type`/`scope_id`'s immediate parent, if known.
    fn parent_id(&self, scope_type: ScopeType, scope_id: &str) -> Option<String>;
}

/// A resolver that never knows any containment. `ancestor_chain` degrades
/// gracefully: it still reaches `global` but skips every intermediate level,
/// so inheritance never leaks into an unrelated org/project it can't name.
pub struct NullScopeResolver;

impl ScopeResolver for NullScopeResolver {
    fn parent_id(&self, _scope_type: ScopeType, _scope_id: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_has_no_id() {
        let s = Scope::global();
        assert!(s.is_valid());
        assert!(s.scope_id.is_none());
    }

    #[test]
    fn non_global_scope_requires_id() {
        let invalid = Scope {
            scope_type: ScopeType::Project,
            scope_id: None,
        };
        assert!(!invalid.is_valid());
        let valid = Scope::new(ScopeType::Project, "proj-1");
        assert!(valid.is_valid());
    }

    #[test]
    fn specificity_orders_session_above_global() {
        assert!(ScopeType::Session.specificity() > ScopeType::Project.specificity());
        assert!(ScopeType::Project.specificity() > ScopeType::Org.specificity());
        assert!(ScopeType::Org.specificity() > ScopeType::Global.specificity());
    }

    #[test]
    fn ancestor_chain_stops_at_global_when_containment_unknown() {
        let s = Scope::new(ScopeType::Session, "s1");
        let chain = s.ancestor_chain(&NullScopeResolver);
        // No containment is known for "s1", so the chain can only name
        // itself and the universal global ancestor.
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last().unwrap().scope_type, ScopeType::Global);
    }

    #[test]
    fn ancestor_chain_resolves_real_ids_through_full_hierarchy() {
        struct FixedResolver;
        impl ScopeResolver for FixedResolver {
            fn parent_id(&self, scope_type: ScopeType, scope_id: &str) -> Option<String> {
                match (scope_type, scope_id) {
                    (ScopeType::Session, "s1") => Some("proj-1".to_string()),
                    (ScopeType::Project, "proj-1") => Some("org-1".to_string()),
                    _ => None,
                }
            }
        }

        let s = Scope::new(ScopeType::Session, "s1");
        let chain = s.ancestor_chain(&FixedResolver);
        assert_eq!(
            chain,
            vec![
                Scope::new(ScopeType::Session, "s1"),
                Scope::new(ScopeType::Project, "proj-1"),
                Scope::new(ScopeType::Org, "org-1"),
                Scope::global(),
            ]
        );
    }
}
