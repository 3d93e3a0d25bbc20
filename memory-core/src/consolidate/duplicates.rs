//! Duplicate/similarity grouping (spec §4.4): group entries by scope, then
//! cluster by embedding cosine similarity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::{cosine_similarity, doc_key, Database};
use crate::types::{EntryId, EntryType, Scope};

/// One cluster of near-duplicate entries within a single scope.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub scope: Scope,
    pub entry_ids: Vec<(EntryType, EntryId)>,
    pub avg_similarity: f32,
    pub min_similarity: f32,
    pub max_similarity: f32,
    pub dominant_types: Vec<EntryType>,
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Groups embedded entries by scope and clusters each scope's entries by
/// pairwise cosine similarity at or above `threshold` (union-find: any
/// chain of pairwise-similar entries joins one cluster).
pub struct DuplicateGrouper {
    db: Arc<Database>,
}

impl DuplicateGrouper {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn group(&self, threshold: f32) -> Vec<DuplicateGroup> {
        let mut by_scope: HashMap<Scope, Vec<(EntryType, EntryId, Vec<f32>)>> = HashMap::new();

        for g in self.db.list_guidelines().into_iter().filter(|g| g.header.is_active) {
            if let Some(v) = self.db.get_embedding(&doc_key(EntryType::Guideline, g.header.id)) {
                by_scope.entry(g.header.scope.clone()).or_default().push((EntryType::Guideline, g.header.id, v));
            }
        }
        for k in self.db.list_knowledge().into_iter().filter(|k| k.header.is_active) {
            if let Some(v) = self.db.get_embedding(&doc_key(EntryType::Knowledge, k.header.id)) {
                by_scope.entry(k.header.scope.clone()).or_default().push((EntryType::Knowledge, k.header.id, v));
            }
        }
        for t in self.db.list_tools().into_iter().filter(|t| t.header.is_active) {
            if let Some(v) = self.db.get_embedding(&doc_key(EntryType::Tool, t.header.id)) {
                by_scope.entry(t.header.scope.clone()).or_default().push((EntryType::Tool, t.header.id, v));
            }
        }
        for e in self.db.list_experiences().into_iter().filter(|e| e.header.is_active) {
            if let Some(v) = self.db.get_embedding(&doc_key(EntryType::Experience, e.header.id)) {
                by_scope.entry(e.header.scope.clone()).or_default().push((EntryType::Experience, e.header.id, v));
            }
        }

        let mut groups = Vec::new();
        for (scope, members) in by_scope {
            groups.extend(Self::cluster_scope(&scope, &members, threshold));
        }
        groups
    }

    fn cluster_scope(scope: &Scope, members: &[(EntryType, EntryId, Vec<f32>)], threshold: f32) -> Vec<DuplicateGroup> {
        let n = members.len();
        if n < 2 {
            return Vec::new();
        }

        let mut pair_sims: HashMap<(usize, usize), f32> = HashMap::new();
        let mut dsu = DisjointSet::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = cosine_similarity(&members[i].2, &members[j].2);
                if sim >= threshold {
                    pair_sims.insert((i, j), sim);
                    dsu.union(i, j);
                }
            }
        }

        let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..n {
            clusters.entry(dsu.find(i)).or_default().push(i);
        }

        clusters
            .into_values()
            .filter(|members_idx| members_idx.len() > 1)
            .map(|members_idx| {
                let mut sims = Vec::new();
                for a in 0..members_idx.len() {
                    for b in (a + 1)..members_idx.len() {
                        let (i, j) = (members_idx[a].min(members_idx[b]), members_idx[a].max(members_idx[b]));
                        if let Some(sim) = pair_sims.get(&(i, j)) {
                            sims.push(*sim);
                        } else {
                            sims.push(cosine_similarity(&members[i].2, &members[j].2));
                        }
                    }
                }
                let avg_similarity = sims.iter().sum::<f32>() / sims.len() as f32;
                let min_similarity = sims.iter().cloned().fold(f32::INFINITY, f32::min);
                let max_similarity = sims.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

                let mut type_counts: HashMap<EntryType, usize> = HashMap::new();
                for &idx in &members_idx {
                    *type_counts.entry(members[idx].0).or_insert(0) += 1;
                }
                let mut dominant_types: Vec<EntryType> = type_counts.into_iter().map(|(t, _)| t).collect();
                dominant_types.sort_by_key(|t| format!("{t}"));

                DuplicateGroup {
                    scope: scope.clone(),
                    entry_ids: members_idx.iter().map(|&idx| (members[idx].0, members[idx].1)).collect(),
                    avg_similarity,
                    min_similarity,
                    max_similarity,
                    dominant_types,
                }
            })
            .collect()
    }
}
