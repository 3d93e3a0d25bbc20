//! Deterministic cache key for a `QueryRequest` (spec §4.2 step 7).

use std::fmt::Write as _;

use super::{QueryAction, QueryRequest, RelationDirection};

#[must_use]
pub fn fingerprint(request: &QueryRequest) -> String {
    let mut key = String::new();
    let _ = write!(
        key,
        "action={:?}|search={:?}|scope={:?}:{:?}|inherit={}|types={:?}|",
        request.action,
        request.search,
        request.scope.scope.scope_type,
        request.scope.scope.scope_id,
        request.scope.inherit,
        request.types,
    );
    let mut tags = request.tags.clone();
    tags.sort();
    let _ = write!(
        key,
        "tags={tags:?}|min_priority={:?}|at_time={:?}|after={:?}|before={:?}|",
        request.min_priority, request.at_time, request.created_after, request.created_before,
    );
    let _ = write!(
        key,
        "include_inactive={}|use_fts5={}|fuzzy={}|regex={:?}|semantic={}|",
        request.include_inactive, request.use_fts5, request.fuzzy, request.regex, request.semantic_search,
    );
    if let Some(related) = &request.related_to {
        let direction = match related.direction {
            RelationDirection::Outgoing => "out",
            RelationDirection::Incoming => "in",
            RelationDirection::Both => "both",
        };
        let _ = write!(key, "related={:?}:{}:{}:{}|", related.entry_type, related.entry_id, direction, related.max_depth);
    }
    let _ = write!(key, "page={}:{}", request.page.limit, request.page.offset);
    key
}
