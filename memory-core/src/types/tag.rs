//! Tags and typed relations between entries (spec §3).

use crate::types::entry::{EntryId, EntryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TagId = Uuid;

/// A globally unique, normalized-lowercase tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bi-directional attach of a tag to an entry. Unique by
/// `(entry_type, entry_id, tag_id)`; duplicate attaches return the existing
/// row (spec invariant P-uniq-attach).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryTag {
    pub id: Uuid,
    pub entry_type: EntryType,
    pub entry_id: EntryId,
    pub tag_id: TagId,
    pub created_at: DateTime<Utc>,
}

/// A typed directed edge between two entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRelation {
    pub id: Uuid,
    pub source_type: EntryType,
    pub source_id: EntryId,
    pub target_type: EntryType,
    pub target_id: EntryId,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}
