//! Consolidation & DPO export (spec §4.4): duplicate/similarity grouping,
//! an optional Leiden-like community-detection pass, and the training-pair
//! exporter for the three decision surfaces.

pub mod community;
pub mod dpo;
pub mod duplicates;

use std::sync::Arc;

use crate::types::{ConsolidateConfig, EntryId};

pub use community::{detect_communities, Community, CommunityDetectionOutcome};
pub use dpo::{export_dpo_pairs, DpoExportOutcome, DpoPair, TrainingExample};
pub use duplicates::{DuplicateGroup, DuplicateGrouper};

use crate::storage::Database;

/// Facade wiring the duplicate grouper and community detector to one
/// configuration (spec §4.4). DPO export (`export_dpo_pairs`) takes its
/// input examples directly from callers and has no database dependency,
/// so it is exposed as a free function rather than a facade method.
pub struct Consolidator {
    db: Arc<Database>,
    config: ConsolidateConfig,
}

impl Consolidator {
    #[must_use]
    pub fn new(db: Arc<Database>, config: ConsolidateConfig) -> Self {
        Self { db, config }
    }

    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        DuplicateGrouper::new(self.db.clone()).group(self.config.duplicate_similarity as f32)
    }

    /// Build a similarity graph from every group's pairwise cosine scores
    /// and run community detection over it (spec §4.4's "similarity
    /// graph" built from the same duplicate-grouping embeddings).
    #[must_use]
    pub fn detect_communities(&self) -> CommunityDetectionOutcome {
        let groups = self.duplicate_groups();
        let mut nodes: Vec<EntryId> = Vec::new();
        let mut edges: Vec<(EntryId, EntryId, f32)> = Vec::new();

        for group in &groups {
            let ids: Vec<EntryId> = group.entry_ids.iter().map(|(_, id)| *id).collect();
            for &id in &ids {
                if !nodes.contains(&id) {
                    nodes.push(id);
                }
            }
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    edges.push((ids[i], ids[j], group.avg_similarity));
                }
            }
        }

        detect_communities(&nodes, &edges, self.config.max_iterations, self.config.min_community_size, self.config.random_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::entry_repo::KnowledgeRepository;
    use crate::storage::doc_key;
    use crate::types::{EntryHeader, EntryType, Knowledge, KnowledgeCategory, Scope};

    fn seed(db: &Arc<Database>, title: &str, embedding: Vec<f32>) {
        let repo = KnowledgeRepository::new(db.clone());
        let k = repo
            .create(
                Knowledge {
                    header: EntryHeader::new(Scope::global(), "agent-1"),
                    title: title.to_string(),
                    content: "content".to_string(),
                    category: KnowledgeCategory::Fact,
                    confidence: 0.9,
                    valid_from: None,
                    valid_until: None,
                },
                &[],
            )
            .unwrap();
        db.put_embedding(&doc_key(EntryType::Knowledge, k.header.id), embedding);
    }

    #[test]
    fn consolidator_wires_grouping_into_community_detection() {
        let db = Arc::new(Database::new());
        seed(&db, "a", vec![1.0, 0.0]);
        seed(&db, "b", vec![0.99, 0.01]);
        seed(&db, "c", vec![0.0, 1.0]);
        seed(&db, "d", vec![0.01, 0.99]);

        let mut config = ConsolidateConfig::default();
        config.min_community_size = 1;
        let consolidator = Consolidator::new(db, config);
        let groups = consolidator.duplicate_groups();
        assert_eq!(groups.len(), 2);

        let outcome = consolidator.detect_communities();
        assert!(!outcome.communities.is_empty());
    }
}
