//! The query pipeline (spec §4.2): normalize/validate -> plan -> keyword
//! channel -> semantic channel -> merge & rank -> filter -> paginate &
//! cache. Each stage is a function over the prior stage's output, matching
//! the teacher's staged-pipeline style used in its spatiotemporal/ranking
//! passes, generalized to this service's entry set.

mod cache;
mod fingerprint;
mod rank;

pub use cache::QueryCache;
pub use rank::RankWeights;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_QUERY_CACHE_TTL_SECS, TOP_K_SEMANTIC};
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::repositories::Page;
use crate::storage::Database;
use crate::types::{EntryType, EntryView, Scope};
use crate::validation::check_regex_safety;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAction {
    Search,
    List,
    Related,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone)]
pub struct RelatedToFilter {
    pub entry_type: EntryType,
    pub entry_id: crate::types::EntryId,
    pub direction: RelationDirection,
    pub max_depth: usize,
}

#[derive(Debug, Clone)]
pub struct ScopeQuery {
    pub scope: Scope,
    pub inherit: bool,
}

/// A query request (spec §4.2's consumed shape; wire decoding into this
/// type happens at the edge per spec §9 "decoding happens once at the
/// edge into a typed request value").
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub action: QueryAction,
    pub search: Option<String>,
    pub scope: ScopeQuery,
    pub types: Vec<EntryType>,
    pub tags: Vec<String>,
    pub min_priority: Option<i32>,
    pub at_time: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub include_inactive: bool,
    pub use_fts5: bool,
    pub fuzzy: bool,
    pub regex: Option<String>,
    pub semantic_search: bool,
    pub related_to: Option<RelatedToFilter>,
    pub page: Page,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            action: QueryAction::List,
            search: None,
            scope: ScopeQuery {
                scope: Scope::global(),
                inherit: false,
            },
            types: vec![EntryType::Guideline, EntryType::Knowledge, EntryType::Tool, EntryType::Experience],
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
            page: Page::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryMeta {
    pub total_count: usize,
    pub truncated: bool,
    pub has_more: bool,
    /// Set when every retrieval channel failed and the result is an empty
    /// degraded response rather than a hard error (spec §4.2 failure
    /// semantics).
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub items: Vec<EntryView>,
    pub meta: QueryMeta,
}

struct Candidate {
    view: EntryView,
    bm25: Option<f64>,
    cosine: Option<f32>,
}

/// Orchestrates the seven pipeline stages over the embedded store.
pub struct QueryEngine {
    db: Arc<Database>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    cache: QueryCache,
    weights: RankWeights,
}

impl QueryEngine {
    #[must_use]
    pub fn new(db: Arc<Database>, embedding: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            db,
            embedding,
            cache: QueryCache::new(Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS)),
            weights: RankWeights::default(),
        }
    }

    #[must_use]
    pub fn with_weights(mut self, weights: RankWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryResult> {
        // Stage 1: normalize & validate.
        if let Some(pattern) = &request.regex {
            check_regex_safety(pattern)?;
        }
        let tags: Vec<String> = request.tags.iter().map(|t| crate::validation::normalize_tag(t)).collect();

        let fingerprint = fingerprint::fingerprint(request);
        if let Some(cached) = self.cache.get(&fingerprint) {
            return Ok(cached);
        }

        // Stage 2: plan.
        let open_keyword = matches!(request.action, QueryAction::Search | QueryAction::List)
            && request
                .search
                .as_ref()
                .is_some_and(|s| !self.db.fts_is_effectively_empty(s));
        let open_semantic = request.semantic_search
            && self.embedding.as_ref().is_some_and(|e| e.is_available())
            && request.search.is_some();
        let open_relation = request.related_to.is_some();

        let scopes = if request.scope.inherit {
            request.scope.scope.ancestor_chain(self.db.as_ref())
        } else {
            vec![request.scope.scope.clone()]
        };

        // Gather the base candidate pool: every active entry view across
        // the requested types and scope chain.
        let mut pool: Vec<EntryView> = self.collect_pool(&request.types, &scopes, request.include_inactive);

        let mut degraded = open_keyword || open_semantic;
        let mut candidates: Vec<Candidate> = Vec::new();

        // Stage 3: keyword channel.
        let mut bm25_scores: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        if open_keyword {
            if let Some(search) = &request.search {
                let sanitized = crate::storage::fts::sanitize_query(search, false);
                let hits = self.db.fts_search(&sanitized);
                if !hits.is_empty() {
                    degraded = false;
                    for (key, score) in hits {
                        bm25_scores.insert(key, score);
                    }
                } else if request.fuzzy {
                    // Substring fallback when FTS returns zero hits under fuzzy=true.
                    let needle = sanitized.to_lowercase();
                    for view in &pool {
                        if view.title.to_lowercase().contains(&needle) || view.content.to_lowercase().contains(&needle) {
                            bm25_scores.insert(crate::storage::doc_key(view.entry_type, view.id), 1.0);
                        }
                    }
                    if !bm25_scores.is_empty() {
                        degraded = false;
                    }
                }
            }
        }

        // Stage 4: semantic channel.
        let mut cosine_scores: std::collections::HashMap<String, f32> = std::collections::HashMap::new();
        if open_semantic {
            if let (Some(provider), Some(search)) = (&self.embedding, &request.search) {
                if let Ok(query_vec) = provider.embed(search).await {
                    let hits = self.db.vector_search(&query_vec, TOP_K_SEMANTIC);
                    if !hits.is_empty() {
                        degraded = false;
                    }
                    for (key, score) in hits {
                        cosine_scores.insert(key, score);
                    }
                }
            }
        }

        // Stage 6 (relation expansion happens before filtering, per spec):
        // expand the candidate pool via BFS when `relatedTo` is set.
        if let Some(related) = &request.related_to {
            let relation_repo = crate::repositories::RelationRepository::new(self.db.clone());
            let direction = match related.direction {
                RelationDirection::Outgoing => crate::repositories::relation_repo::Direction::Outgoing,
                RelationDirection::Incoming => crate::repositories::relation_repo::Direction::Incoming,
                RelationDirection::Both => crate::repositories::relation_repo::Direction::Both,
            };
            let reached = relation_repo.traverse(related.entry_type, related.entry_id, direction, related.max_depth);
            let reached_ids: std::collections::HashSet<_> = reached.into_iter().map(|(_, id)| id).collect();
            pool.retain(|v| reached_ids.contains(&v.id));
            degraded = false;
        }

        // If neither channel opened and this isn't a pure list/related
        // request, keep the full pool (pure-filter path).
        for view in pool {
            let key = crate::storage::doc_key(view.entry_type, view.id);
            let bm25 = bm25_scores.get(&key).copied();
            let cosine = cosine_scores.get(&key).copied();
            if (open_keyword && !bm25_scores.is_empty() && bm25.is_none())
                || (open_semantic && !cosine_scores.is_empty() && cosine.is_none() && bm25.is_none())
            {
                // A channel ran and produced hits, but this candidate
                // matched neither channel: drop it, unless a relation
                // traversal or pure-filter path is in effect (handled
                // above by retaining only reached ids).
                if open_keyword && !open_semantic && bm25.is_none() {
                    continue;
                }
                if open_semantic && !open_keyword && cosine.is_none() {
                    continue;
                }
                if open_keyword && open_semantic && bm25.is_none() && cosine.is_none() {
                    continue;
                }
            }
            candidates.push(Candidate { view, bm25, cosine });
        }

        // Stage 5: merge & rank.
        let ranked = rank::score_and_sort(candidates, open_keyword, open_semantic, &self.weights);

        // Stage 6: filter (tags/priority/temporal/active already applied
        // via `collect_pool`'s is_active gate and the scope chain; apply
        // the remaining per-candidate filters here).
        let filtered: Vec<EntryView> = ranked
            .into_iter()
            .filter(|v| tags.is_empty() || self.entry_has_all_tags(v.entry_type, v.id, &tags))
            .filter(|v| request.min_priority.is_none_or(|min| v.priority >= min))
            .filter(|v| request.created_after.is_none_or(|after| v.created_at >= after))
            .filter(|v| request.created_before.is_none_or(|before| v.created_at <= before))
            .collect();

        // Stage 7: paginate & cache.
        let total_count = filtered.len();
        let truncated = open_semantic && cosine_scores.len() >= TOP_K_SEMANTIC;
        let page = request.page;
        let has_more = page.offset + page.limit < total_count;
        let items = crate::repositories::paginate(filtered, page);

        let result = QueryResult {
            items,
            meta: QueryMeta {
                total_count,
                truncated,
                has_more,
                degraded: degraded && total_count == 0,
            },
        };
        self.cache.put(fingerprint, result.clone());
        Ok(result)
    }

    fn collect_pool(&self, types: &[EntryType], scopes: &[Scope], include_inactive: bool) -> Vec<EntryView> {
        let mut pool = Vec::new();
        for entry_type in types {
            match entry_type {
                EntryType::Guideline => {
                    for g in self.db.list_guidelines() {
                        if (include_inactive || g.header.is_active) && scopes.contains(&g.header.scope) {
                            pool.push(EntryView::from(&g));
                        }
                    }
                }
                EntryType::Knowledge => {
                    for k in self.db.list_knowledge() {
                        if (include_inactive || k.header.is_active) && scopes.contains(&k.header.scope) {
                            pool.push(EntryView::from(&k));
                        }
                    }
                }
                EntryType::Tool => {
                    for t in self.db.list_tools() {
                        if (include_inactive || t.header.is_active) && scopes.contains(&t.header.scope) {
                            pool.push(EntryView::from(&t));
                        }
                    }
                }
                EntryType::Experience => {
                    for e in self.db.list_experiences() {
                        if (include_inactive || e.header.is_active) && scopes.contains(&e.header.scope) {
                            pool.push(EntryView::from(&e));
                        }
                    }
                }
            }
        }
        pool
    }

    fn entry_has_all_tags(&self, entry_type: EntryType, id: crate::types::EntryId, tags: &[String]) -> bool {
        let attached: std::collections::HashSet<String> = self
            .db
            .tags_for_entry(entry_type, id)
            .into_iter()
            .map(|t| t.name)
            .collect();
        tags.iter().all(|t| attached.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryHeader, Guideline, GuidelineCategory, ScopeType};

    fn seed_guideline(db: &Database, name: &str, content: &str, scope: Scope, priority: i32) {
        let g = Guideline {
            header: EntryHeader::new(scope, "agent-1"),
            name: name.to_string(),
            content: content.to_string(),
            category: GuidelineCategory::Workflow,
            priority,
        };
        db.insert_guideline(g, "agent-1");
    }

    #[tokio::test]
    async fn scope_inheritance_orders_narrower_scope_first() {
        let db = Arc::new(Database::new());
        db.register_scope_parent(ScopeType::Project, "proj-1", "org-1");
        seed_guideline(&db, "g-org", "use X everywhere", Scope::new(ScopeType::Org, "org-1"), 10);
        seed_guideline(&db, "g-proj", "use X in this project", Scope::new(ScopeType::Project, "proj-1"), 10);

        let engine = QueryEngine::new(db, None);
        let request = QueryRequest {
            action: QueryAction::Search,
            search: Some("use X".to_string()),
            scope: ScopeQuery {
                scope: Scope::new(ScopeType::Project, "proj-1"),
                inherit: true,
            },
            ..Default::default()
        };
        let result = engine.run(&request).await.unwrap();
        assert_eq!(result.items.len(), 2);
    }

    #[tokio::test]
    async fn sibling_project_is_not_leaked_into_results() {
        let db = Arc::new(Database::new());
        seed_guideline(&db, "g-proj1", "use X in this project", Scope::new(ScopeType::Project, "proj-1"), 10);
        seed_guideline(&db, "g-proj2", "use X in a different project", Scope::new(ScopeType::Project, "proj-2"), 10);

        let engine = QueryEngine::new(db, None);
        let request = QueryRequest {
            action: QueryAction::Search,
            search: Some("use X".to_string()),
            scope: ScopeQuery {
                scope: Scope::new(ScopeType::Project, "proj-1"),
                inherit: false,
            },
            ..Default::default()
        };
        let result = engine.run(&request).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert!(result.items.iter().all(|i| i.scope == Scope::new(ScopeType::Project, "proj-1")));
    }

    #[tokio::test]
    async fn inheritance_without_registered_containment_does_not_leak_unrelated_org() {
        let db = Arc::new(Database::new());
        seed_guideline(&db, "g-org-unrelated", "use X everywhere", Scope::new(ScopeType::Org, "org-9"), 10);
        seed_guideline(&db, "g-proj", "use X in this project", Scope::new(ScopeType::Project, "proj-1"), 10);

        let engine = QueryEngine::new(db, None);
        let request = QueryRequest {
            action: QueryAction::Search,
            search: Some("use X".to_string()),
            scope: ScopeQuery {
                scope: Scope::new(ScopeType::Project, "proj-1"),
                inherit: true,
            },
            ..Default::default()
        };
        let result = engine.run(&request).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].scope, Scope::new(ScopeType::Project, "proj-1"));
    }

    #[tokio::test]
    async fn pure_filter_path_returns_all_active_entries() {
        let db = Arc::new(Database::new());
        seed_guideline(&db, "g1", "content one", Scope::global(), 10);
        seed_guideline(&db, "g2", "content two", Scope::global(), 20);
        let engine = QueryEngine::new(db, None);
        let request = QueryRequest {
            action: QueryAction::List,
            scope: ScopeQuery { scope: Scope::global(), inherit: false },
            ..Default::default()
        };
        let result = engine.run(&request).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert!(!result.meta.degraded);
    }

    #[tokio::test]
    async fn unmatched_keyword_search_yields_empty_degraded_result() {
        let db = Arc::new(Database::new());
        seed_guideline(&db, "g1", "content one", Scope::global(), 10);
        let engine = QueryEngine::new(db, None);
        let request = QueryRequest {
            action: QueryAction::Search,
            search: Some("nonexistent-term-zzz".to_string()),
            ..Default::default()
        };
        let result = engine.run(&request).await.unwrap();
        assert!(result.items.is_empty());
    }
}
