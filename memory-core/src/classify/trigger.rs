//! High-confidence experience cue detection (spec §4.3.2): a user turn that
//! reads like a fixed-bug or learned-lesson narrative should be redirected
//! to experience capture instead of the classifier's normal guideline/
//! knowledge/tool split, even before the classifier runs.

use regex::Regex;

/// Parsed `{title, scenario, outcome}` fields pulled out of a triggering
/// turn by regex heuristics (spec §4.3.2: "parse the text into
/// `{title, scenario, outcome}` via regex heuristics").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceFields {
    pub title: String,
    pub scenario: String,
    pub outcome: String,
}

struct TriggerPattern {
    regex: Regex,
    /// Builds `{title, scenario, outcome}` from this pattern's captures.
    build: fn(&regex::Captures) -> ExperienceFields,
}

/// Regex family for spec §4.3.2's experience cues, plus the fallback parse
/// used once a trigger fires but no single family captures cleanly.
pub struct TriggerDetector {
    patterns: Vec<TriggerPattern>,
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_capture(s: &str) -> String {
    s.trim().trim_end_matches('.').to_string()
}

impl TriggerDetector {
    #[must_use]
    pub fn new() -> Self {
        let patterns = vec![
            TriggerPattern {
                regex: Regex::new(r"(?i)^fixed\s+(?P<title>.+?)\s+by\s+(?P<fix>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: format!("Fixed {}", trim_capture(&c["title"])),
                    scenario: trim_capture(&c["title"]),
                    outcome: format!("success - {}", trim_capture(&c["fix"])),
                },
            },
            TriggerPattern {
                regex: Regex::new(r"(?i)^learned\s+that\s+(?P<lesson>.+?)\s+(?:when|while)\s+(?P<context>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: format!("Learned: {}", trim_capture(&c["lesson"])),
                    scenario: trim_capture(&c["context"]),
                    outcome: trim_capture(&c["lesson"]),
                },
            },
            TriggerPattern {
                regex: Regex::new(r"(?i)^(?:the\s+)?root\s+cause\s+was\s+(?P<cause>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: format!("Root cause: {}", trim_capture(&c["cause"])),
                    scenario: trim_capture(&c["cause"]),
                    outcome: format!("identified root cause - {}", trim_capture(&c["cause"])),
                },
            },
            TriggerPattern {
                regex: Regex::new(r"(?i)^the\s+(?:fix|solution)\s+was\s+(?P<fix>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: "Applied a fix".to_string(),
                    scenario: "issue required a fix".to_string(),
                    outcome: format!("success - {}", trim_capture(&c["fix"])),
                },
            },
            TriggerPattern {
                regex: Regex::new(r"(?i)^figured\s+out\s+(?P<title>.+?)\s+by\s+(?P<fix>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: format!("Figured out {}", trim_capture(&c["title"])),
                    scenario: trim_capture(&c["title"]),
                    outcome: format!("success - {}", trim_capture(&c["fix"])),
                },
            },
            TriggerPattern {
                regex: Regex::new(r"^(?P<title>[^:]{3,80}):\s*(?P<outcome>.+)$").unwrap(),
                build: |c| ExperienceFields {
                    title: trim_capture(&c["title"]),
                    scenario: trim_capture(&c["title"]),
                    outcome: trim_capture(&c["outcome"]),
                },
            },
        ];
        Self { patterns }
    }

    #[must_use]
    pub fn has_high_confidence_trigger(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.regex.is_match(text.trim()))
    }

    /// Parse `text` into experience fields via the first matching family.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<ExperienceFields> {
        let trimmed = text.trim();
        self.patterns.iter().find_map(|p| p.regex.captures(trimmed).map(|c| (p.build)(&c)))
    }

    /// A coarse category inferred from the matched outcome text (spec
    /// §4.3.2: "infer an experience category").
    #[must_use]
    pub fn infer_category(fields: &ExperienceFields) -> String {
        let haystack = format!("{} {}", fields.scenario, fields.outcome).to_lowercase();
        if haystack.contains("auth") || haystack.contains("token") || haystack.contains("permission") || haystack.contains("security") {
            "security".to_string()
        } else if haystack.contains("bug") || haystack.contains("fix") || haystack.contains("error") || haystack.contains("crash") {
            "debugging".to_string()
        } else if haystack.contains("perf") || haystack.contains("slow") || haystack.contains("latency") {
            "performance".to_string()
        } else {
            "general".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_by_pattern_parses_title_and_outcome() {
        let detector = TriggerDetector::new();
        assert!(detector.has_high_confidence_trigger("Fixed the auth bug by refreshing tokens"));
        let fields = detector.parse("Fixed the auth bug by refreshing tokens").unwrap();
        assert_eq!(fields.title, "Fixed the auth bug");
        assert_eq!(fields.outcome, "success - refreshing tokens");
        assert_eq!(TriggerDetector::infer_category(&fields), "security");
    }

    #[test]
    fn root_cause_pattern_parses() {
        let detector = TriggerDetector::new();
        let fields = detector.parse("root cause was a stale cache entry").unwrap();
        assert!(fields.title.starts_with("Root cause:"));
    }

    #[test]
    fn unrelated_text_does_not_trigger() {
        let detector = TriggerDetector::new();
        assert!(!detector.has_high_confidence_trigger("What time is it?"));
    }
}
