//! DPO (direct preference optimization) training-pair export (spec §4.4,
//! invariant P-dpo-pair): reshape scored decisions from the three capture/
//! retrieval/consolidation surfaces into `{prompt, chosen, rejected}`
//! pairs.

use std::collections::HashMap;

/// One scored decision from any of the three surfaces the spec names
/// (extraction, retrieval, consolidation). The surface itself is not
/// modeled here — only the state bucket it groups under and its reward —
/// since the export step is surface-agnostic (spec §4.4: "transforms
/// training examples from three decision surfaces... into preference
/// pairs").
#[derive(Debug, Clone)]
pub struct TrainingExample {
    /// Groups examples whose state features are considered comparable;
    /// pairs are only ever formed within a bucket.
    pub state_key: String,
    pub prompt: String,
    pub completion: String,
    pub reward: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DpoPair {
    pub prompt: String,
    pub chosen: String,
    pub rejected: String,
    pub reward_delta: f64,
}

#[derive(Debug, Clone)]
pub struct DpoExportOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub pairs: Vec<DpoPair>,
}

/// Form preference pairs within each state bucket whose reward differs by
/// at least `min_reward_delta`; each example pairs with its nearest
/// higher-reward bucket-mate scanning in descending-reward order, so a
/// bucket of N examples yields at most N-1 pairs rather than
/// all-pairs-squared. Buckets that yield no qualifying pair contribute
/// nothing; if the export as a whole yields zero pairs, return
/// `success=false` rather than an empty-but-nominally-successful result
/// (spec §4.4: "cause the exporter to return `{success:false,
/// error:'Insufficient training pairs'}` rather than emitting partial
/// data").
#[must_use]
pub fn export_dpo_pairs(examples: &[TrainingExample], min_reward_delta: f64) -> DpoExportOutcome {
    let mut buckets: HashMap<&str, Vec<&TrainingExample>> = HashMap::new();
    for example in examples {
        buckets.entry(example.state_key.as_str()).or_default().push(example);
    }

    let mut pairs = Vec::new();
    for mut bucket in buckets.into_values() {
        bucket.sort_by(|a, b| b.reward.partial_cmp(&a.reward).unwrap_or(std::cmp::Ordering::Equal));
        for window in bucket.windows(2) {
            let (higher, lower) = (window[0], window[1]);
            let delta = higher.reward - lower.reward;
            if delta >= min_reward_delta {
                pairs.push(DpoPair {
                    prompt: higher.prompt.clone(),
                    chosen: higher.completion.clone(),
                    rejected: lower.completion.clone(),
                    reward_delta: delta,
                });
            }
        }
    }

    if pairs.is_empty() {
        return DpoExportOutcome {
            success: false,
            error: Some("Insufficient training pairs".to_string()),
            pairs: Vec::new(),
        };
    }

    DpoExportOutcome {
        success: true,
        error: None,
        pairs,
    }
}
