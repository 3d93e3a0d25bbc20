//! Typed entry relations used for causal/reference chains (spec §3
//! `EntryRelation`, spec §4.2 relation traversal, spec §4.3 episode
//! `trace_causal_chain`-style walks).

use crate::constants::MAX_RELATION_DEPTH;
use crate::storage::Database;
use crate::types::{EntryId, EntryRelation, EntryType};
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

pub struct RelationRepository {
    db: Arc<Database>,
}

impl RelationRepository {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn link(
        &self,
        source_type: EntryType,
        source_id: EntryId,
        target_type: EntryType,
        target_id: EntryId,
        relation_type: impl Into<String>,
    ) -> EntryRelation {
        let relation = EntryRelation {
            id: Uuid::new_v4(),
            source_type,
            source_id,
            target_type,
            target_id,
            relation_type: relation_type.into(),
            created_at: Utc::now(),
        };
        self.db.add_relation(relation.clone());
        relation
    }

    /// BFS traversal up to `max_depth` (clamped to `MAX_RELATION_DEPTH`,
    /// spec §4.2 `relatedTo.maxDepth <= 10`). Returns every entry id
    /// reached, excluding the start node.
    #[must_use]
    pub fn traverse(
        &self,
        start_type: EntryType,
        start_id: EntryId,
        direction: Direction,
        max_depth: usize,
    ) -> Vec<(EntryType, EntryId)> {
        let max_depth = max_depth.min(MAX_RELATION_DEPTH);
        let mut visited: HashSet<(EntryType, EntryId)> = HashSet::new();
        visited.insert((start_type, start_id));
        let mut frontier: VecDeque<((EntryType, EntryId), usize)> = VecDeque::new();
        frontier.push_back(((start_type, start_id), 0));
        let mut found = Vec::new();

        while let Some(((etype, eid), depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let mut neighbors = Vec::new();
            if direction != Direction::Incoming {
                neighbors.extend(
                    self.db
                        .relations_from(etype, eid)
                        .into_iter()
                        .map(|r| (r.target_type, r.target_id)),
                );
            }
            if direction != Direction::Outgoing {
                // Incoming edges: scan all relations whose target matches.
                // The embedded store has no reverse index; this is a
                // best-effort linear scan acceptable at this scale.
                neighbors.extend(self.incoming_neighbors(etype, eid));
            }
            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    found.push(neighbor);
                    frontier.push_back((neighbor, depth + 1));
                }
            }
        }
        found
    }

    fn incoming_neighbors(&self, target_type: EntryType, target_id: EntryId) -> Vec<(EntryType, EntryId)> {
        self.db
            .relations_to(target_type, target_id)
            .into_iter()
            .map(|r| (r.source_type, r.source_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traverse_follows_outgoing_edges_up_to_depth() {
        let db = Arc::new(Database::new());
        let repo = RelationRepository::new(db);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        repo.link(EntryType::Guideline, a, EntryType::Guideline, b, "causes");
        repo.link(EntryType::Guideline, b, EntryType::Guideline, c, "causes");

        let reached = repo.traverse(EntryType::Guideline, a, Direction::Outgoing, 1);
        assert_eq!(reached, vec![(EntryType::Guideline, b)]);

        let reached = repo.traverse(EntryType::Guideline, a, Direction::Outgoing, 2);
        assert!(reached.contains(&(EntryType::Guideline, c)));
    }

    #[test]
    fn traverse_follows_incoming_edges() {
        let db = Arc::new(Database::new());
        let repo = RelationRepository::new(db);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        repo.link(EntryType::Guideline, a, EntryType::Guideline, b, "causes");

        let reached = repo.traverse(EntryType::Guideline, b, Direction::Incoming, 1);
        assert_eq!(reached, vec![(EntryType::Guideline, a)]);
    }

    #[test]
    fn traverse_depth_clamped_to_max() {
        let db = Arc::new(Database::new());
        let repo = RelationRepository::new(db);
        let a = Uuid::new_v4();
        let reached = repo.traverse(EntryType::Guideline, a, Direction::Outgoing, 999);
        assert!(reached.is_empty());
    }
}
