//! Merge & rank stage (spec §4.2 step 5): fuse the keyword and semantic
//! channels' scores with priority and freshness into one ranking.
//!
//! The spec states the fusion weights for the two-channel case and that a
//! single open channel's normalized score is the final score; it is silent
//! on what happens when neither channel opens (a pure filter/list/related
//! query). We resolve that silence by renormalizing the two always-present
//! terms (priority, freshness) so every candidate still gets a comparable
//! score, then apply the spec's explicit tie-break.

use crate::types::EntryView;
use chrono::Utc;

use super::Candidate;

#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub keyword: f64,
    pub semantic: f64,
    pub priority: f64,
    pub freshness: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            keyword: 0.45,
            semantic: 0.35,
            priority: 0.10,
            freshness: 0.10,
        }
    }
}

/// A ranked candidate, score descending, with the spec's tie-break applied:
/// scope specificity (narrower first), then `createdAt` descending, then
/// `id` ascending.
fn tie_break(a: &EntryView, b: &EntryView) -> std::cmp::Ordering {
    b.scope
        .scope_type
        .specificity()
        .cmp(&a.scope.scope_type.specificity())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn freshness(view: &EntryView) -> f64 {
    let age_secs = (Utc::now() - view.created_at).num_seconds().max(0) as f64;
    // Half-life decay over 30 days, clamped to [0, 1].
    let half_life_secs = 30.0 * 24.0 * 3600.0;
    (0.5f64.powf(age_secs / half_life_secs)).clamp(0.0, 1.0)
}

/// Score every candidate per the rule matching which channels opened, sort
/// descending by score with the tie-break, and return the bare `EntryView`s.
pub fn score_and_sort(
    candidates: Vec<Candidate>,
    open_keyword: bool,
    open_semantic: bool,
    weights: &RankWeights,
) -> Vec<EntryView> {
    let max_bm25 = candidates
        .iter()
        .filter_map(|c| c.bm25)
        .fold(0.0_f64, f64::max)
        .max(1e-9);

    let mut scored: Vec<(f64, EntryView)> = candidates
        .into_iter()
        .map(|c| {
            let norm_bm25 = c.bm25.map(|s| s / max_bm25).unwrap_or(0.0);
            let cosine = c.cosine.unwrap_or(0.0) as f64;
            let priority_term = f64::from(c.view.priority) / 100.0;
            let fresh = freshness(&c.view);

            let score = match (open_keyword, open_semantic) {
                (true, true) => {
                    weights.keyword * norm_bm25
                        + weights.semantic * cosine
                        + weights.priority * priority_term
                        + weights.freshness * fresh
                }
                (true, false) => norm_bm25,
                (false, true) => cosine,
                (false, false) => {
                    let total = weights.priority + weights.freshness;
                    if total <= 0.0 {
                        0.0
                    } else {
                        (weights.priority * priority_term + weights.freshness * fresh) / total
                    }
                }
            };
            (score, c.view)
        })
        .collect();

    scored.sort_by(|(score_a, view_a), (score_b, view_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tie_break(view_a, view_b))
    });

    scored.into_iter().map(|(_, view)| view).collect()
}
