//! Tag attach/detach repository (spec §3 `Tag`/`EntryTag`, invariant
//! P-uniq-attach).

use crate::storage::Database;
use crate::types::{EntryId, EntryTag, EntryType, Tag};
use std::sync::Arc;

pub struct TagRepository {
    db: Arc<Database>,
}

impl TagRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn get_or_create(&self, name: &str, category: Option<String>) -> Tag {
        self.db.get_or_create_tag(name, category)
    }

    /// Races are resolved by looking up the existing row and returning it
    /// (spec §4.1 `attach`).
    pub fn attach(&self, entry_type: EntryType, entry_id: EntryId, tag_name: &str) -> EntryTag {
        let tag = self.db.get_or_create_tag(tag_name, None);
        self.db.attach_tag(entry_type, entry_id, tag.id)
    }

    pub fn detach(&self, entry_type: EntryType, entry_id: EntryId, tag_name: &str) {
        let tag = self.db.get_or_create_tag(tag_name, None);
        self.db.detach_tag(entry_type, entry_id, tag.id);
    }

    #[must_use]
    pub fn tags_for(&self, entry_type: EntryType, entry_id: EntryId) -> Vec<Tag> {
        self.db.tags_for_entry(entry_type, entry_id)
    }

    #[must_use]
    pub fn entries_with_all_tags(&self, entry_type: EntryType, tags: &[String]) -> Vec<EntryId> {
        self.db.entries_with_all_tags(entry_type, tags)
    }
}
