//! The embedded single-process store: entity tables, FTS index, and vector
//! index, all behind one `parking_lot::RwLock` so writes to a single row
//! are strictly serialized (spec §5) while readers see either pre- or
//! post-state, never partial.
//!
//! This stands in for the teacher's split Turso (durable, SQL) / redb
//! (cache) backends (`do-memory-storage-turso`, `do-memory-storage-redb`):
//! spec's Non-goals fix this service to a single-process store over "an
//! embedded relational DB plus an embedded vector index", so one in-memory
//! table set plays both roles here. Swapping in a real embedded SQL engine
//! means reimplementing the methods below against it; callers only see the
//! `Database` surface.

pub mod fts;

use crate::types::*;
use chrono::{DateTime, Utc};
use fts::FtsIndex;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// One row of the append-only audit log (spec §4.1 "emitting an audit
/// record in the same transaction when an agent identifier is supplied").
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entry_type: Option<EntryType>,
    pub entry_id: Option<EntryId>,
    pub at: DateTime<Utc>,
}

/// All entity tables, guarded by a single lock. Each public method takes
/// the lock for the minimum span needed to read or mutate its tables.
#[derive(Default)]
pub struct Database {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    guidelines: HashMap<EntryId, Guideline>,
    knowledge: HashMap<EntryId, Knowledge>,
    tools: HashMap<EntryId, Tool>,
    experiences: HashMap<EntryId, Experience>,

    tags_by_id: HashMap<TagId, Tag>,
    tags_by_name: HashMap<String, TagId>,
    entry_tags: Vec<EntryTag>,
    entry_relations: Vec<EntryRelation>,

    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<MessageId, Message>,
    conversation_contexts: Vec<ConversationContext>,

    episodes: HashMap<EpisodeId, Episode>,
    episode_events: Vec<EpisodeEvent>,
    episode_links: Vec<EpisodeLink>,

    file_locks: HashMap<String, FileLock>,

    classification_feedback: Vec<ClassificationFeedback>,
    pattern_confidence: HashMap<String, PatternConfidence>,

    audit_log: Vec<AuditRecord>,

    embeddings: HashMap<String, Vec<f32>>,
    fts: FtsIndex,

    scope_parents: HashMap<(ScopeType, String), String>,
}

/// Key used in the FTS index and embedding table for a given entry.
#[must_use]
pub fn doc_key(entry_type: EntryType, id: EntryId) -> String {
    format!("{entry_type}:{id}")
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn audit(tables: &mut Tables, actor: &str, action: &str, entry_type: Option<EntryType>, entry_id: Option<EntryId>) {
        // Best-effort: never rolls back the primary write (spec §4.1).
        tables.audit_log.push(AuditRecord {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            entry_type,
            entry_id,
            at: Utc::now(),
        });
    }

    // ---- Guidelines ----

    pub fn insert_guideline(&self, g: Guideline, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Guideline, g.header.id);
        tables.fts.index(&key, &format!("{} {}", g.name, g.content));
        let id = g.header.id;
        tables.guidelines.insert(id, g);
        Self::audit(&mut tables, actor, "create", Some(EntryType::Guideline), Some(id));
    }

    pub fn get_guideline(&self, id: EntryId) -> Option<Guideline> {
        self.inner.read().guidelines.get(&id).cloned()
    }

    pub fn find_guideline_by_name(&self, name: &str, scope: &Scope) -> Option<Guideline> {
        self.inner
            .read()
            .guidelines
            .values()
            .find(|g| g.name == name && &g.header.scope == scope)
            .cloned()
    }

    pub fn list_guidelines(&self) -> Vec<Guideline> {
        self.inner.read().guidelines.values().cloned().collect()
    }

    pub fn update_guideline(&self, g: Guideline, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Guideline, g.header.id);
        tables.fts.index(&key, &format!("{} {}", g.name, g.content));
        let id = g.header.id;
        tables.guidelines.insert(id, g);
        Self::audit(&mut tables, actor, "update", Some(EntryType::Guideline), Some(id));
    }

    /// Hard-delete, distinct from `deactivate` (spec §6.1 CRUD actions
    /// include both `deactivate` and `delete`).
    pub fn remove_guideline(&self, id: EntryId, actor: &str) -> bool {
        let mut tables = self.inner.write();
        let removed = tables.guidelines.remove(&id).is_some();
        if removed {
            tables.fts.remove(&doc_key(EntryType::Guideline, id));
            Self::audit(&mut tables, actor, "delete", Some(EntryType::Guideline), Some(id));
        }
        removed
    }

    // ---- Knowledge ----

    pub fn insert_knowledge(&self, k: Knowledge, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Knowledge, k.header.id);
        tables.fts.index(&key, &format!("{} {}", k.title, k.content));
        let id = k.header.id;
        tables.knowledge.insert(id, k);
        Self::audit(&mut tables, actor, "create", Some(EntryType::Knowledge), Some(id));
    }

    pub fn get_knowledge(&self, id: EntryId) -> Option<Knowledge> {
        self.inner.read().knowledge.get(&id).cloned()
    }

    pub fn find_knowledge_by_title(&self, title: &str, scope: &Scope) -> Option<Knowledge> {
        self.inner
            .read()
            .knowledge
            .values()
            .find(|k| k.title == title && &k.header.scope == scope)
            .cloned()
    }

    pub fn list_knowledge(&self) -> Vec<Knowledge> {
        self.inner.read().knowledge.values().cloned().collect()
    }

    pub fn update_knowledge(&self, k: Knowledge, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Knowledge, k.header.id);
        tables.fts.index(&key, &format!("{} {}", k.title, k.content));
        let id = k.header.id;
        tables.knowledge.insert(id, k);
        Self::audit(&mut tables, actor, "update", Some(EntryType::Knowledge), Some(id));
    }

    pub fn remove_knowledge(&self, id: EntryId, actor: &str) -> bool {
        let mut tables = self.inner.write();
        let removed = tables.knowledge.remove(&id).is_some();
        if removed {
            tables.fts.remove(&doc_key(EntryType::Knowledge, id));
            Self::audit(&mut tables, actor, "delete", Some(EntryType::Knowledge), Some(id));
        }
        removed
    }

    // ---- Tools ----

    pub fn insert_tool(&self, t: Tool, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Tool, t.header.id);
        tables.fts.index(&key, &format!("{} {}", t.name, t.description));
        let id = t.header.id;
        tables.tools.insert(id, t);
        Self::audit(&mut tables, actor, "create", Some(EntryType::Tool), Some(id));
    }

    pub fn get_tool(&self, id: EntryId) -> Option<Tool> {
        self.inner.read().tools.get(&id).cloned()
    }

    pub fn find_tool_by_name(&self, name: &str, scope: &Scope) -> Option<Tool> {
        self.inner
            .read()
            .tools
            .values()
            .find(|t| t.name == name && &t.header.scope == scope)
            .cloned()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner.read().tools.values().cloned().collect()
    }

    pub fn update_tool(&self, t: Tool, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Tool, t.header.id);
        tables.fts.index(&key, &format!("{} {}", t.name, t.description));
        let id = t.header.id;
        tables.tools.insert(id, t);
        Self::audit(&mut tables, actor, "update", Some(EntryType::Tool), Some(id));
    }

    pub fn remove_tool(&self, id: EntryId, actor: &str) -> bool {
        let mut tables = self.inner.write();
        let removed = tables.tools.remove(&id).is_some();
        if removed {
            tables.fts.remove(&doc_key(EntryType::Tool, id));
            Self::audit(&mut tables, actor, "delete", Some(EntryType::Tool), Some(id));
        }
        removed
    }

    // ---- Experiences ----

    pub fn insert_experience(&self, e: Experience, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Experience, e.header.id);
        tables
            .fts
            .index(&key, &format!("{} {} {}", e.title, e.scenario, e.outcome_detail));
        let id = e.header.id;
        tables.experiences.insert(id, e);
        Self::audit(&mut tables, actor, "create", Some(EntryType::Experience), Some(id));
    }

    pub fn get_experience(&self, id: EntryId) -> Option<Experience> {
        self.inner.read().experiences.get(&id).cloned()
    }

    pub fn find_experience_by_title(&self, title: &str, scope: &Scope) -> Option<Experience> {
        self.inner
            .read()
            .experiences
            .values()
            .find(|e| e.title == title && &e.header.scope == scope)
            .cloned()
    }

    pub fn list_experiences(&self) -> Vec<Experience> {
        self.inner.read().experiences.values().cloned().collect()
    }

    pub fn update_experience(&self, e: Experience, actor: &str) {
        let mut tables = self.inner.write();
        let key = doc_key(EntryType::Experience, e.header.id);
        tables
            .fts
            .index(&key, &format!("{} {} {}", e.title, e.scenario, e.outcome_detail));
        let id = e.header.id;
        tables.experiences.insert(id, e);
        Self::audit(&mut tables, actor, "update", Some(EntryType::Experience), Some(id));
    }

    pub fn remove_experience(&self, id: EntryId, actor: &str) -> bool {
        let mut tables = self.inner.write();
        let removed = tables.experiences.remove(&id).is_some();
        if removed {
            tables.fts.remove(&doc_key(EntryType::Experience, id));
            Self::audit(&mut tables, actor, "delete", Some(EntryType::Experience), Some(id));
        }
        removed
    }

    // ---- Tags ----

    /// Idempotent get-or-create by normalized name (spec §4.1 `getOrCreate`).
    pub fn get_or_create_tag(&self, name: &str, category: Option<String>) -> Tag {
        let normalized = crate::validation::normalize_tag(name);
        let mut tables = self.inner.write();
        if let Some(id) = tables.tags_by_name.get(&normalized) {
            return tables.tags_by_id[id].clone();
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: normalized.clone(),
            category,
            created_at: Utc::now(),
        };
        tables.tags_by_name.insert(normalized, tag.id);
        tables.tags_by_id.insert(tag.id, tag.clone());
        tag
    }

    /// Idempotent attach: races are resolved by returning the existing row
    /// (spec §4.1, invariant P-uniq-attach).
    pub fn attach_tag(&self, entry_type: EntryType, entry_id: EntryId, tag_id: TagId) -> EntryTag {
        let mut tables = self.inner.write();
        if let Some(existing) = tables
            .entry_tags
            .iter()
            .find(|et| et.entry_type == entry_type && et.entry_id == entry_id && et.tag_id == tag_id)
        {
            return existing.clone();
        }
        let entry_tag = EntryTag {
            id: Uuid::new_v4(),
            entry_type,
            entry_id,
            tag_id,
            created_at: Utc::now(),
        };
        tables.entry_tags.push(entry_tag.clone());
        entry_tag
    }

    pub fn detach_tag(&self, entry_type: EntryType, entry_id: EntryId, tag_id: TagId) {
        let mut tables = self.inner.write();
        tables
            .entry_tags
            .retain(|et| !(et.entry_type == entry_type && et.entry_id == entry_id && et.tag_id == tag_id));
    }

    pub fn tags_for_entry(&self, entry_type: EntryType, entry_id: EntryId) -> Vec<Tag> {
        let tables = self.inner.read();
        tables
            .entry_tags
            .iter()
            .filter(|et| et.entry_type == entry_type && et.entry_id == entry_id)
            .filter_map(|et| tables.tags_by_id.get(&et.tag_id).cloned())
            .collect()
    }

    pub fn entries_with_all_tags(&self, entry_type: EntryType, tag_names: &[String]) -> Vec<EntryId> {
        let tables = self.inner.read();
        let normalized: Vec<String> = tag_names.iter().map(|t| crate::validation::normalize_tag(t)).collect();
        let tag_ids: Vec<TagId> = normalized
            .iter()
            .filter_map(|n| tables.tags_by_name.get(n).copied())
            .collect();
        if tag_ids.len() != normalized.len() {
            // at least one requested tag doesn't exist at all -> no matches
            return Vec::new();
        }
        let mut counts: HashMap<EntryId, usize> = HashMap::new();
        for et in tables
            .entry_tags
            .iter()
            .filter(|et| et.entry_type == entry_type && tag_ids.contains(&et.tag_id))
        {
            *counts.entry(et.entry_id).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, c)| *c == tag_ids.len())
            .map(|(id, _)| id)
            .collect()
    }

    // ---- Relations ----

    pub fn add_relation(&self, relation: EntryRelation) {
        self.inner.write().entry_relations.push(relation);
    }

    pub fn relations_from(&self, entry_type: EntryType, entry_id: EntryId) -> Vec<EntryRelation> {
        self.inner
            .read()
            .entry_relations
            .iter()
            .filter(|r| r.source_type == entry_type && r.source_id == entry_id)
            .cloned()
            .collect()
    }

    pub fn relations_to(&self, entry_type: EntryType, entry_id: EntryId) -> Vec<EntryRelation> {
        self.inner
            .read()
            .entry_relations
            .iter()
            .filter(|r| r.target_type == entry_type && r.target_id == entry_id)
            .cloned()
            .collect()
    }

    // ---- Conversations / messages ----

    pub fn insert_conversation(&self, c: Conversation) {
        self.inner.write().conversations.insert(c.id, c);
    }

    pub fn get_conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.inner.read().conversations.get(&id).cloned()
    }

    pub fn update_conversation(&self, c: Conversation) {
        self.inner.write().conversations.insert(c.id, c);
    }

    pub fn list_conversations(&self) -> Vec<Conversation> {
        self.inner.read().conversations.values().cloned().collect()
    }

    pub fn insert_message(&self, m: Message) {
        self.inner.write().messages.insert(m.id, m);
    }

    pub fn messages_for_conversation(&self, conversation_id: ConversationId) -> Vec<Message> {
        let tables = self.inner.read();
        let mut msgs: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        msgs.sort_by_key(|m| m.created_at);
        msgs
    }

    pub fn link_context(&self, ctx: ConversationContext) {
        self.inner.write().conversation_contexts.push(ctx);
    }

    pub fn context_for_conversation(&self, conversation_id: ConversationId) -> Vec<ConversationContext> {
        self.inner
            .read()
            .conversation_contexts
            .iter()
            .filter(|c| c.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    // ---- Episodes ----

    pub fn insert_episode(&self, e: Episode) {
        self.inner.write().episodes.insert(e.id, e);
    }

    pub fn get_episode(&self, id: EpisodeId) -> Option<Episode> {
        self.inner.read().episodes.get(&id).cloned()
    }

    pub fn update_episode(&self, e: Episode) {
        self.inner.write().episodes.insert(e.id, e);
    }

    pub fn active_episode_for_session(&self, session_id: &str) -> Option<Episode> {
        self.inner
            .read()
            .episodes
            .values()
            .find(|e| e.session_id == session_id && e.status == EpisodeStatus::Active)
            .cloned()
    }

    pub fn episode_by_name(&self, session_id: &str, name: &str) -> Option<Episode> {
        self.inner
            .read()
            .episodes
            .values()
            .find(|e| e.session_id == session_id && e.name == name)
            .cloned()
    }

    pub fn add_episode_event(&self, ev: EpisodeEvent) {
        self.inner.write().episode_events.push(ev);
    }

    pub fn events_for_episode(&self, episode_id: EpisodeId) -> Vec<EpisodeEvent> {
        let tables = self.inner.read();
        let mut events: Vec<EpisodeEvent> = tables
            .episode_events
            .iter()
            .filter(|e| e.episode_id == episode_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        events
    }

    pub fn add_episode_link(&self, link: EpisodeLink) {
        self.inner.write().episode_links.push(link);
    }

    pub fn links_for_episode(&self, episode_id: EpisodeId) -> Vec<EpisodeLink> {
        self.inner
            .read()
            .episode_links
            .iter()
            .filter(|l| l.episode_id == episode_id)
            .cloned()
            .collect()
    }

    // ---- File locks ----

    pub fn get_lock(&self, file_path: &str) -> Option<FileLock> {
        self.inner.read().file_locks.get(file_path).cloned()
    }

    pub fn put_lock(&self, lock: FileLock) {
        self.inner.write().file_locks.insert(lock.file_path.clone(), lock);
    }

    pub fn remove_lock(&self, file_path: &str) {
        self.inner.write().file_locks.remove(file_path);
    }

    pub fn list_locks(&self) -> Vec<FileLock> {
        self.inner.read().file_locks.values().cloned().collect()
    }

    /// Purge all locks whose `expires_at` has passed, returning the count
    /// removed (spec §4.5.2 `cleanupExpiredLocks`).
    pub fn cleanup_expired_locks(&self, at: DateTime<Utc>) -> usize {
        let mut tables = self.inner.write();
        let before = tables.file_locks.len();
        tables.file_locks.retain(|_, lock| !lock.is_expired_at(at));
        before - tables.file_locks.len()
    }

    // ---- Classification feedback / pattern confidence ----

    pub fn record_feedback(&self, feedback: ClassificationFeedback) {
        self.inner.write().classification_feedback.push(feedback);
    }

    pub fn all_feedback(&self) -> Vec<ClassificationFeedback> {
        self.inner.read().classification_feedback.clone()
    }

    pub fn get_pattern_confidence(&self, pattern_id: &str) -> Option<PatternConfidence> {
        self.inner.read().pattern_confidence.get(pattern_id).cloned()
    }

    pub fn put_pattern_confidence(&self, pc: PatternConfidence) {
        self.inner.write().pattern_confidence.insert(pc.pattern_id.clone(), pc);
    }

    pub fn all_pattern_confidence(&self) -> Vec<PatternConfidence> {
        self.inner.read().pattern_confidence.values().cloned().collect()
    }

    // ---- Audit ----

    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.inner.read().audit_log.clone()
    }

    // ---- FTS / embeddings ----

    pub fn fts_search(&self, query: &str) -> Vec<(String, f64)> {
        self.inner.read().fts.search(query)
    }

    pub fn fts_is_effectively_empty(&self, query: &str) -> bool {
        self.inner.read().fts.is_effectively_empty(query)
    }

    pub fn put_embedding(&self, key: &str, embedding: Vec<f32>) {
        self.inner.write().embeddings.insert(key.to_string(), embedding);
    }

    pub fn get_embedding(&self, key: &str) -> Option<Vec<f32>> {
        self.inner.read().embeddings.get(key).cloned()
    }

    pub fn remove_embedding(&self, key: &str) -> bool {
        self.inner.write().embeddings.remove(key).is_some()
    }

    /// Brute-force nearest-neighbor search over all stored embeddings,
    /// standing in for the teacher's vector-index query (spec §4.2 step 4).
    /// Returns `(doc_key, cosine_similarity)` sorted descending, capped at
    /// `top_k`.
    pub fn vector_search(&self, query: &[f32], top_k: usize) -> Vec<(String, f32)> {
        let tables = self.inner.read();
        let mut scored: Vec<(String, f32)> = tables
            .embeddings
            .iter()
            .filter(|(_, v)| v.len() == query.len())
            .map(|(k, v)| (k.clone(), cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    // ---- Scope containment ----

    /// Declare that `scope_id` (of `scope_type`) is contained by
    /// `parent_id` (its parent scope's id, e.g. a project's owning org).
    /// Feeds `ancestor_chain`'s inheritance resolution; nothing is inferred
    /// automatically since no other table in this store records org/project
    /// membership.
    pub fn register_scope_parent(&self, scope_type: ScopeType, scope_id: impl Into<String>, parent_id: impl Into<String>) {
        self.inner.write().scope_parents.insert((scope_type, scope_id.into()), parent_id.into());
    }

    pub fn resolve_scope_parent(&self, scope_type: ScopeType, scope_id: &str) -> Option<String> {
        self.inner.read().scope_parents.get(&(scope_type, scope_id.to_string())).cloned()
    }
}

impl ScopeResolver for Database {
    fn parent_id(&self, scope_type: ScopeType, scope_id: &str) -> Option<String> {
        self.resolve_scope_parent(scope_type, scope_id)
    }
}

/// Cosine similarity between two equal-length vectors. Returns `0.0` for a
/// zero-magnitude vector rather than dividing by zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guideline(scope: Scope) -> Guideline {
        Guideline {
            header: EntryHeader::new(scope, "agent-1"),
            name: "g1".into(),
            content: "always lock files".into(),
            category: GuidelineCategory::Workflow,
            priority: 10,
        }
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let db = Database::new();
        let g = guideline(Scope::global());
        let id = g.header.id;
        db.insert_guideline(g.clone(), "agent-1");
        let fetched = db.get_guideline(id).unwrap();
        assert_eq!(fetched.name, g.name);
    }

    #[test]
    fn attach_tag_is_idempotent() {
        let db = Database::new();
        let tag = db.get_or_create_tag("Security", None);
        let entry_id = Uuid::new_v4();
        let a = db.attach_tag(EntryType::Guideline, entry_id, tag.id);
        let b = db.attach_tag(EntryType::Guideline, entry_id, tag.id);
        assert_eq!(a.id, b.id);
        assert_eq!(db.tags_for_entry(EntryType::Guideline, entry_id).len(), 1);
    }

    #[test]
    fn get_or_create_tag_normalizes() {
        let db = Database::new();
        let a = db.get_or_create_tag("Security", None);
        let b = db.get_or_create_tag("  security ", None);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn audit_write_never_blocks_primary_write() {
        let db = Database::new();
        let g = guideline(Scope::global());
        db.insert_guideline(g.clone(), "agent-1");
        assert!(db.get_guideline(g.header.id).is_some());
        assert_eq!(db.audit_log().len(), 1);
    }

    #[test]
    fn expired_lock_reclaimed_on_cleanup() {
        let db = Database::new();
        db.put_lock(FileLock {
            file_path: "/a/b.ts".into(),
            checked_out_by: "agent-old".into(),
            checked_out_at: Utc::now() - chrono::Duration::seconds(10),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(5)),
        });
        let purged = db.cleanup_expired_locks(Utc::now());
        assert_eq!(purged, 1);
        assert!(db.get_lock("/a/b.ts").is_none());
    }

    #[test]
    fn vector_search_ranks_by_cosine() {
        let db = Database::new();
        db.put_embedding("a", vec![1.0, 0.0]);
        db.put_embedding("b", vec![0.0, 1.0]);
        let results = db.vector_search(&[1.0, 0.0], 5);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn entries_with_all_tags_requires_full_match() {
        let db = Database::new();
        let entry = Uuid::new_v4();
        let t1 = db.get_or_create_tag("security", None);
        let t2 = db.get_or_create_tag("testing", None);
        db.attach_tag(EntryType::Guideline, entry, t1.id);
        let matches = db.entries_with_all_tags(EntryType::Guideline, &["security".into(), "testing".into()]);
        assert!(matches.is_empty());
        db.attach_tag(EntryType::Guideline, entry, t2.id);
        let matches = db.entries_with_all_tags(EntryType::Guideline, &["security".into(), "testing".into()]);
        assert_eq!(matches, vec![entry]);
    }
}
