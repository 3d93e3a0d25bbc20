//! CRUD repositories for the four `Entry` variants (spec §3, §4.1).

use crate::constants::size_limits;
use crate::error::{Error, Result};
use crate::repositories::{paginate, Page};
use crate::storage::Database;
use crate::types::*;
use crate::validation::{check_confidence, check_len, check_priority, check_tags, require_non_empty};
use std::sync::Arc;

/// Filter accepted by `GuidelineRepository::list` et al. Repositories are
/// scope-exact; the query pipeline performs inheritance expansion by
/// calling `list` once per scope in the ancestor chain (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub scope: Option<Scope>,
    pub include_inactive: bool,
}

impl EntryFilter {
    fn matches_scope(&self, scope: &Scope) -> bool {
        self.scope.as_ref().is_none_or_eq(scope)
    }
}

/// Small local extension so `Option<&Scope>::is_none_or_eq` reads cleanly
/// above without pulling in an external crate for one comparison.
trait OptionScopeExt {
    fn is_none_or_eq(&self, other: &Scope) -> bool;
}

impl OptionScopeExt for Option<&Scope> {
    fn is_none_or_eq(&self, other: &Scope) -> bool {
        match self {
            None => true,
            Some(s) => *s == other,
        }
    }
}

pub struct GuidelineRepository {
    db: Arc<Database>,
}

impl GuidelineRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, mut entry: Guideline, tags: &[String]) -> Result<Guideline> {
        require_non_empty("name", &entry.name)?;
        check_len("name", &entry.name, size_limits::NAME_MAX_LENGTH)?;
        check_len("content", &entry.content, size_limits::CONTENT_MAX_LENGTH)?;
        check_priority(entry.priority)?;
        check_tags(tags)?;
        if !entry.header.scope.is_valid() {
            return Err(Error::validation("scope", "scope_id required unless scope is global"));
        }
        if self
            .db
            .find_guideline_by_name(&entry.name, &entry.header.scope)
            .is_some()
        {
            return Err(Error::UniqueConstraint {
                field: "name".to_string(),
                value: entry.name.clone(),
                scope: format!("{:?}", entry.header.scope.scope_type),
            });
        }
        entry.header.updated_at = entry.header.created_at;
        self.db.insert_guideline(entry.clone(), &entry.header.created_by);
        for tag in tags {
            let t = self.db.get_or_create_tag(tag, None);
            self.db.attach_tag(EntryType::Guideline, entry.header.id, t.id);
        }
        Ok(entry)
    }

    /// Idempotent create: on a unique-constraint collision, return the
    /// existing row instead of erroring (spec §4.1 `attach`/`getOrCreate`
    /// policy generalized to entry creation under concurrent retries).
    pub fn get_or_create(&self, entry: Guideline, tags: &[String]) -> Result<Guideline> {
        match self.create(entry.clone(), tags) {
            Ok(e) => Ok(e),
            Err(Error::UniqueConstraint { .. }) => self
                .db
                .find_guideline_by_name(&entry.name, &entry.header.scope)
                .ok_or_else(|| Error::internal("race on unique constraint left no row")),
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<Guideline> {
        self.db.get_guideline(id)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str, scope: &Scope) -> Option<Guideline> {
        self.db.find_guideline_by_name(name, scope)
    }

    #[must_use]
    pub fn list(&self, filter: &EntryFilter, page: Page) -> Vec<Guideline> {
        let items: Vec<Guideline> = self
            .db
            .list_guidelines()
            .into_iter()
            .filter(|g| filter.include_inactive || g.header.is_active)
            .filter(|g| filter.matches_scope(&g.header.scope))
            .collect();
        paginate(items, page)
    }

    pub fn update(&self, entry: Guideline) -> Result<Guideline> {
        check_len("content", &entry.content, size_limits::CONTENT_MAX_LENGTH)?;
        check_priority(entry.priority)?;
        let mut entry = entry;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_guideline(entry.clone(), &entry.header.created_by);
        Ok(entry)
    }

    pub fn deactivate(&self, id: EntryId) -> Result<()> {
        let mut entry = self.db.get_guideline(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        entry.header.is_active = false;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_guideline(entry.clone(), &entry.header.created_by);
        Ok(())
    }

    /// Hard-delete, distinct from `deactivate` (spec §6.1).
    pub fn delete(&self, id: EntryId) -> Result<()> {
        let entry = self.db.get_guideline(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        self.db.remove_guideline(id, &entry.header.created_by);
        Ok(())
    }
}

pub struct KnowledgeRepository {
    db: Arc<Database>,
}

impl KnowledgeRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, mut entry: Knowledge, tags: &[String]) -> Result<Knowledge> {
        require_non_empty("title", &entry.title)?;
        check_len("title", &entry.title, size_limits::TITLE_MAX_LENGTH)?;
        check_len("content", &entry.content, size_limits::CONTENT_MAX_LENGTH)?;
        check_confidence(entry.confidence)?;
        check_tags(tags)?;
        if !entry.header.scope.is_valid() {
            return Err(Error::validation("scope", "scope_id required unless scope is global"));
        }
        if self
            .db
            .find_knowledge_by_title(&entry.title, &entry.header.scope)
            .is_some()
        {
            return Err(Error::UniqueConstraint {
                field: "title".to_string(),
                value: entry.title.clone(),
                scope: format!("{:?}", entry.header.scope.scope_type),
            });
        }
        entry.header.updated_at = entry.header.created_at;
        self.db.insert_knowledge(entry.clone(), &entry.header.created_by);
        for tag in tags {
            let t = self.db.get_or_create_tag(tag, None);
            self.db.attach_tag(EntryType::Knowledge, entry.header.id, t.id);
        }
        Ok(entry)
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<Knowledge> {
        self.db.get_knowledge(id)
    }

    #[must_use]
    pub fn list(&self, filter: &EntryFilter, at_time: Option<chrono::DateTime<chrono::Utc>>, page: Page) -> Vec<Knowledge> {
        let items: Vec<Knowledge> = self
            .db
            .list_knowledge()
            .into_iter()
            .filter(|k| filter.include_inactive || k.header.is_active)
            .filter(|k| filter.matches_scope(&k.header.scope))
            .filter(|k| at_time.is_none_or(|at| k.valid_at(at)))
            .collect();
        paginate(items, page)
    }

    pub fn update(&self, entry: Knowledge) -> Result<Knowledge> {
        check_confidence(entry.confidence)?;
        let mut entry = entry;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_knowledge(entry.clone(), &entry.header.created_by);
        Ok(entry)
    }

    pub fn deactivate(&self, id: EntryId) -> Result<()> {
        let mut entry = self.db.get_knowledge(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        entry.header.is_active = false;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_knowledge(entry.clone(), &entry.header.created_by);
        Ok(())
    }

    pub fn delete(&self, id: EntryId) -> Result<()> {
        let entry = self.db.get_knowledge(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        self.db.remove_knowledge(id, &entry.header.created_by);
        Ok(())
    }
}

pub struct ToolRepository {
    db: Arc<Database>,
}

impl ToolRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, mut entry: Tool, tags: &[String]) -> Result<Tool> {
        require_non_empty("name", &entry.name)?;
        check_len("name", &entry.name, size_limits::NAME_MAX_LENGTH)?;
        check_len("description", &entry.description, size_limits::DESCRIPTION_MAX_LENGTH)?;
        check_tags(tags)?;
        if !entry.header.scope.is_valid() {
            return Err(Error::validation("scope", "scope_id required unless scope is global"));
        }
        if self.db.find_tool_by_name(&entry.name, &entry.header.scope).is_some() {
            return Err(Error::UniqueConstraint {
                field: "name".to_string(),
                value: entry.name.clone(),
                scope: format!("{:?}", entry.header.scope.scope_type),
            });
        }
        entry.header.updated_at = entry.header.created_at;
        self.db.insert_tool(entry.clone(), &entry.header.created_by);
        for tag in tags {
            let t = self.db.get_or_create_tag(tag, None);
            self.db.attach_tag(EntryType::Tool, entry.header.id, t.id);
        }
        Ok(entry)
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<Tool> {
        self.db.get_tool(id)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str, scope: &Scope) -> Option<Tool> {
        self.db.find_tool_by_name(name, scope)
    }

    #[must_use]
    pub fn list(&self, filter: &EntryFilter, page: Page) -> Vec<Tool> {
        let items: Vec<Tool> = self
            .db
            .list_tools()
            .into_iter()
            .filter(|t| filter.include_inactive || t.header.is_active)
            .filter(|t| filter.matches_scope(&t.header.scope))
            .collect();
        paginate(items, page)
    }

    /// Append a new version to the tool's version chain and make it
    /// current (spec §3: "tools carry an explicit version chain").
    pub fn new_version(&self, id: EntryId, version: ToolVersion) -> Result<Tool> {
        let mut entry = self.db.get_tool(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        entry.current_version = version;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_tool(entry.clone(), &entry.header.created_by);
        Ok(entry)
    }

    pub fn deactivate(&self, id: EntryId) -> Result<()> {
        let mut entry = self.db.get_tool(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        entry.header.is_active = false;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_tool(entry.clone(), &entry.header.created_by);
        Ok(())
    }

    pub fn delete(&self, id: EntryId) -> Result<()> {
        let entry = self.db.get_tool(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        self.db.remove_tool(id, &entry.header.created_by);
        Ok(())
    }
}

pub struct ExperienceRepository {
    db: Arc<Database>,
}

impl ExperienceRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, mut entry: Experience, tags: &[String]) -> Result<Experience> {
        require_non_empty("title", &entry.title)?;
        check_len("title", &entry.title, size_limits::TITLE_MAX_LENGTH)?;
        check_len("scenario", &entry.scenario, size_limits::CONTENT_MAX_LENGTH)?;
        check_confidence(entry.confidence)?;
        check_tags(tags)?;
        if !entry.header.scope.is_valid() {
            return Err(Error::validation("scope", "scope_id required unless scope is global"));
        }
        entry.header.updated_at = entry.header.created_at;
        self.db.insert_experience(entry.clone(), &entry.header.created_by);
        for tag in tags {
            let t = self.db.get_or_create_tag(tag, None);
            self.db.attach_tag(EntryType::Experience, entry.header.id, t.id);
        }
        Ok(entry)
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<Experience> {
        self.db.get_experience(id)
    }

    #[must_use]
    pub fn find_by_title(&self, title: &str, scope: &Scope) -> Option<Experience> {
        self.db.find_experience_by_title(title, scope)
    }

    #[must_use]
    pub fn list(&self, filter: &EntryFilter, page: Page) -> Vec<Experience> {
        let items: Vec<Experience> = self
            .db
            .list_experiences()
            .into_iter()
            .filter(|e| filter.include_inactive || e.header.is_active)
            .filter(|e| filter.matches_scope(&e.header.scope))
            .collect();
        paginate(items, page)
    }

    pub fn deactivate(&self, id: EntryId) -> Result<()> {
        let mut entry = self.db.get_experience(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        entry.header.is_active = false;
        entry.header.updated_at = chrono::Utc::now();
        self.db.update_experience(entry.clone(), &entry.header.created_by);
        Ok(())
    }

    pub fn delete(&self, id: EntryId) -> Result<()> {
        let entry = self.db.get_experience(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        self.db.remove_experience(id, &entry.header.created_by);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Arc<Database> {
        Arc::new(Database::new())
    }

    fn guideline() -> Guideline {
        Guideline {
            header: EntryHeader::new(Scope::global(), "agent-1"),
            name: "always-lock".into(),
            content: "always take the file lock before editing".into(),
            category: GuidelineCategory::Workflow,
            priority: 50,
        }
    }

    #[test]
    fn create_then_get_is_bit_exact_up_to_server_fields() {
        let repo = GuidelineRepository::new(db());
        let g = guideline();
        let created = repo.create(g.clone(), &[]).unwrap();
        let fetched = repo.get(created.header.id).unwrap();
        assert_eq!(fetched.name, g.name);
        assert_eq!(fetched.content, g.content);
    }

    #[test]
    fn duplicate_name_in_scope_is_unique_constraint() {
        let repo = GuidelineRepository::new(db());
        repo.create(guideline(), &[]).unwrap();
        let err = repo.create(guideline(), &[]).unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint { .. }));
    }

    #[test]
    fn get_or_create_is_idempotent_under_collision() {
        let repo = GuidelineRepository::new(db());
        let first = repo.get_or_create(guideline(), &[]).unwrap();
        let second = repo.get_or_create(guideline(), &[]).unwrap();
        assert_eq!(first.header.id, second.header.id);
    }

    #[test]
    fn name_over_max_length_rejected() {
        let repo = GuidelineRepository::new(db());
        let mut g = guideline();
        g.name = "x".repeat(size_limits::NAME_MAX_LENGTH + 1);
        assert!(repo.create(g, &[]).is_err());
    }

    #[test]
    fn deactivate_sets_is_active_false() {
        let repo = GuidelineRepository::new(db());
        let g = repo.create(guideline(), &[]).unwrap();
        repo.deactivate(g.header.id).unwrap();
        assert!(!repo.get(g.header.id).unwrap().header.is_active);
    }

    #[test]
    fn list_limit_zero_clamps_to_one() {
        let repo = GuidelineRepository::new(db());
        for i in 0..3 {
            let mut g = guideline();
            g.name = format!("g{i}");
            repo.create(g, &[]).unwrap();
        }
        let page = Page::new(0, 0);
        assert_eq!(repo.list(&EntryFilter::default(), page).len(), 1);
    }

    #[test]
    fn delete_removes_entry_entirely_unlike_deactivate() {
        let repo = GuidelineRepository::new(db());
        let g = repo.create(guideline(), &[]).unwrap();
        repo.delete(g.header.id).unwrap();
        assert!(repo.get(g.header.id).is_none());
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let repo = GuidelineRepository::new(db());
        assert!(matches!(repo.delete(EntryId::new_v4()).unwrap_err(), Error::NotFound { .. }));
    }
}
