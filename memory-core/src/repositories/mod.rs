//! Repository layer: the only path through which entities are written.
//!
//! Each repository method is responsible for (1) invariant validation,
//! (2) writing the row, (3) keeping the FTS index consistent, and (4)
//! relying on `storage::Database`'s best-effort audit write — matching
//! spec §4.1's five responsibilities (embedding-index maintenance is
//! handled by the classification/query layers that own the embedding
//! provider, not by the repository itself).

pub mod conversation_repo;
pub mod entry_repo;
pub mod episode_repo;
pub mod lock_repo;
pub mod relation_repo;
pub mod tag_repo;

pub use conversation_repo::ConversationRepository;
pub use entry_repo::{EntryFilter, ExperienceRepository, GuidelineRepository, KnowledgeRepository, ToolRepository};
pub use episode_repo::EpisodeRepository;
pub use lock_repo::LockRepository;
pub use relation_repo::RelationRepository;
pub use tag_repo::TagRepository;

use crate::validation::{clamp_limit, clamp_offset};

/// Pagination parameters shared by every `list` contract (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: clamp_limit(limit),
            offset: clamp_offset(offset),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_QUERY_LIMIT as i64, 0)
    }
}

/// Slice a vector per `Page`, preserving list()'s documented "insertion
/// order unless overridden" default.
pub fn paginate<T>(mut items: Vec<T>, page: Page) -> Vec<T> {
    if page.offset >= items.len() {
        return Vec::new();
    }
    let end = (page.offset + page.limit).min(items.len());
    items.drain(page.offset..end).collect()
}
