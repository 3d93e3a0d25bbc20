//! Ordered catalog of labeled classification patterns (spec §4.3.1 pattern
//! stage), grounded in the teacher's pattern-as-data style
//! (`memory-core::pattern::Pattern`) generalized from time-series pattern
//! variants to a flat regex rule table for free-text classification.

use regex::Regex;

use crate::types::ClassifiedType;

/// One labeled pattern: a compiled regex plus the type it votes for and its
/// static weight before any learned adjustment.
pub struct PatternRule {
    pub id: &'static str,
    pub pattern_type: ClassifiedType,
    pub base_weight: f64,
    regex: Regex,
}

impl PatternRule {
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

struct AntiPattern {
    regex: Regex,
    /// The specific rule id this phrase vetoes, not the whole type (spec
    /// §4.3.1: "Anti-patterns... veto tool-class matches that would
    /// otherwise fire on the word 'make'" — only the `make`-triggered rule,
    /// not every tool-type match).
    vetoed_rule_id: &'static str,
}

/// The compiled pattern set and its anti-pattern vetoes.
pub struct Catalog {
    rules: Vec<PatternRule>,
    anti_patterns: Vec<AntiPattern>,
}

impl Catalog {
    /// Build the built-in catalog. Grounded in spec §4.3.2's trigger
    /// families and §4.3.1's example ("make sure"/"make the"/"make it").
    #[must_use]
    pub fn default_catalog() -> Self {
        let rule = |id: &'static str, pattern_type: ClassifiedType, base_weight: f64, pattern: &str| PatternRule {
            id,
            pattern_type,
            base_weight,
            regex: Regex::new(pattern).expect("built-in catalog pattern compiles"),
        };

        let rules = vec![
            rule("guideline-modal", ClassifiedType::Guideline, 0.8, r"(?i)\b(always|never|must|should)\b"),
            rule("guideline-rule-prefix", ClassifiedType::Guideline, 0.85, r"(?i)^\s*rule\s*:"),
            rule("guideline-prefer", ClassifiedType::Guideline, 0.6, r"(?i)\bprefer\b"),
            rule("knowledge-copula", ClassifiedType::Knowledge, 0.55, r"(?i)\b(is|are|was|were)\b"),
            rule("knowledge-decision", ClassifiedType::Knowledge, 0.65, r"(?i)\b(decided|chose|we use|uses)\b"),
            rule("knowledge-reference", ClassifiedType::Knowledge, 0.55, r"(?i)\b(see|refer to|documented (at|in))\b"),
            rule("tool-run", ClassifiedType::Tool, 0.75, r"(?i)\brun\b"),
            rule("tool-make", ClassifiedType::Tool, 0.5, r"(?i)\bmake\b"),
            rule("tool-backtick", ClassifiedType::Tool, 0.7, r"`[^`]+`"),
            rule("tool-cli-invocation", ClassifiedType::Tool, 0.65, r"(?i)\b(npm|cargo|pytest|git|docker)\s+\S+"),
        ];

        let anti = |pattern: &str, vetoed_rule_id: &'static str| AntiPattern {
            regex: Regex::new(pattern).expect("built-in anti-pattern compiles"),
            vetoed_rule_id,
        };
        let anti_patterns = vec![
            anti(r"(?i)\bmake sure\b", "tool-make"),
            anti(r"(?i)\bmake the\b", "tool-make"),
            anti(r"(?i)\bmake it\b", "tool-make"),
        ];

        Self { rules, anti_patterns }
    }

    /// Every rule that matches `text` and isn't vetoed by an anti-pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> Vec<&PatternRule> {
        let vetoed: Vec<&str> = self
            .anti_patterns
            .iter()
            .filter(|a| a.regex.is_match(text))
            .map(|a| a.vetoed_rule_id)
            .collect();
        self.rules
            .iter()
            .filter(|r| r.is_match(text) && !vetoed.contains(&r.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guideline_modal_matches_always() {
        let catalog = Catalog::default_catalog();
        let hits = catalog.matches("Rule: always use X");
        assert!(hits.iter().any(|r| r.id == "guideline-modal"));
        assert!(hits.iter().any(|r| r.id == "guideline-rule-prefix"));
    }

    #[test]
    fn anti_pattern_vetoes_make_sure_but_not_run() {
        let catalog = Catalog::default_catalog();
        let hits = catalog.matches("make sure to run the migration");
        assert!(!hits.iter().any(|r| r.id == "tool-make"));
        assert!(hits.iter().any(|r| r.id == "tool-run"));
    }

    #[test]
    fn bare_make_is_not_vetoed() {
        let catalog = Catalog::default_catalog();
        let hits = catalog.matches("make the build artifact");
        // "make the" is itself a vetoed phrase.
        assert!(!hits.iter().any(|r| r.id == "tool-make"));
        let hits = catalog.matches("make a sandwich");
        assert!(hits.iter().any(|r| r.id == "tool-make"));
    }
}
