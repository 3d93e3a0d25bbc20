//! Size/array/ReDoS guards shared by repositories and the query pipeline.
//!
//! Grounded in the teacher's `types::constants` validation style, generalized
//! to the field set this service's entities carry.

use crate::constants::size_limits;
use crate::error::{Error, Result};
use regex::Regex;

/// Reject a string field that exceeds `max_len`. Equal-to-max is accepted
/// (spec §8 boundary: "length exactly `NAME_MAX_LENGTH` is accepted").
pub fn check_len(field: &str, value: &str, max_len: usize) -> Result<()> {
    let actual = value.chars().count();
    if actual > max_len {
        return Err(Error::size_limit(field, max_len, actual));
    }
    Ok(())
}

/// Reject an empty required string field.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, format!("{field} must not be empty")));
    }
    Ok(())
}

/// Validate a tag list: count cap plus per-tag length.
pub fn check_tags(tags: &[String]) -> Result<()> {
    if tags.len() > size_limits::TAGS_MAX_COUNT {
        return Err(Error::size_limit(
            "tags",
            size_limits::TAGS_MAX_COUNT,
            tags.len(),
        ));
    }
    for tag in tags {
        check_len("tags[]", tag, size_limits::NAME_MAX_LENGTH)?;
    }
    Ok(())
}

/// Normalize a tag name: lowercase, trimmed. Tag names are globally unique
/// after normalization (spec §3 Tag entity).
#[must_use]
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate a `priority` field lies in `[0, 100]`.
pub fn check_priority(priority: i32) -> Result<()> {
    if !(0..=100).contains(&priority) {
        return Err(Error::validation(
            "priority",
            format!("priority must be within [0, 100], got {priority}"),
        ));
    }
    Ok(())
}

/// Validate a `confidence` field lies in `[0.0, 1.0]`.
pub fn check_confidence(confidence: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(Error::validation(
            "confidence",
            format!("confidence must be within [0.0, 1.0], got {confidence}"),
        ));
    }
    Ok(())
}

/// Validate a `metadata` object's serialized size, guarding against the
/// circular-reference case by relying on `serde_json::to_vec`'s inherent
/// recursion bound rather than walking the value ourselves (a cycle cannot
/// exist in an owned `serde_json::Value` tree, so this never loops).
pub fn check_metadata_size(metadata: &serde_json::Value) -> Result<()> {
    let bytes = serde_json::to_vec(metadata)
        .map_err(|e| Error::validation("metadata", format!("metadata not serializable: {e}")))?;
    if bytes.len() > size_limits::METADATA_MAX_BYTES {
        return Err(Error::size_limit(
            "metadata",
            size_limits::METADATA_MAX_BYTES,
            bytes.len(),
        ));
    }
    Ok(())
}

/// Clamp a caller-supplied `limit` into `[1, MAX_QUERY_LIMIT]` (spec §8
/// boundary behavior).
#[must_use]
pub fn clamp_limit(limit: i64) -> usize {
    let limit = limit.clamp(1, crate::constants::MAX_QUERY_LIMIT as i64);
    limit as usize
}

/// Clamp a caller-supplied `offset` into `[0, MAX_OFFSET]`.
#[must_use]
pub fn clamp_offset(offset: i64) -> usize {
    let offset = offset.clamp(0, crate::constants::MAX_OFFSET as i64);
    offset as usize
}

/// Reject a caller-supplied regex that is structurally likely to be
/// catastrophic (spec §7 ReDoS guard) or exceeds the configured length cap.
/// This is a syntactic heuristic, not a proof of linear-time matching.
pub fn check_regex_safety(pattern: &str) -> Result<()> {
    if pattern.len() > size_limits::REGEX_PATTERN_MAX_LENGTH {
        return Err(Error::size_limit(
            "regex",
            size_limits::REGEX_PATTERN_MAX_LENGTH,
            pattern.len(),
        ));
    }

    // Nested quantifiers: (x+)+, (x*)*, (x?)+, (.*)* etc.
    let nested_quantifier = Regex::new(r"\([^()]*[+*?]\)[+*]").expect("static pattern compiles");
    if nested_quantifier.is_match(pattern) {
        return Err(Error::validation(
            "regex",
            "pattern has nested quantifiers that can cause catastrophic backtracking",
        ));
    }

    // Overlapping alternation inside a repeated group: (a|a)+, (ab|a)+
    let overlapping_alt = Regex::new(r"\(([^()|]+)\|\1[^()]*\)[+*]").expect("static pattern compiles");
    if overlapping_alt.is_match(pattern) {
        return Err(Error::validation(
            "regex",
            "pattern has overlapping alternation under repetition",
        ));
    }

    // Excessive bounded repetition: {n,m} with m > 10000 (or n > 10000).
    let bounded_repetition = Regex::new(r"\{(\d+)(?:,(\d+))?\}").expect("static pattern compiles");
    for caps in bounded_repetition.captures_iter(pattern) {
        let lo: u64 = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let hi: u64 = caps
            .get(2)
            .map_or(lo, |m| m.as_str().parse().unwrap_or(lo));
        if lo > 10_000 || hi > 10_000 {
            return Err(Error::validation(
                "regex",
                "pattern has excessive bounded repetition",
            ));
        }
    }

    // Validate the pattern actually compiles under the `regex` crate (which
    // itself refuses genuinely exponential constructs it cannot represent).
    Regex::new(pattern).map_err(|e| Error::validation("regex", format!("invalid pattern: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_at_max_length_is_accepted() {
        let name = "a".repeat(size_limits::NAME_MAX_LENGTH);
        assert!(check_len("name", &name, size_limits::NAME_MAX_LENGTH).is_ok());
    }

    #[test]
    fn name_over_max_length_is_rejected() {
        let name = "a".repeat(size_limits::NAME_MAX_LENGTH + 1);
        assert!(check_len("name", &name, size_limits::NAME_MAX_LENGTH).is_err());
    }

    #[test]
    fn metadata_circular_reference_cannot_occur_and_is_bounded() {
        let metadata = serde_json::json!({ "a": { "b": { "c": "small" } } });
        assert!(check_metadata_size(&metadata).is_ok());
    }

    #[test]
    fn metadata_over_size_is_rejected() {
        let big = "x".repeat(size_limits::METADATA_MAX_BYTES + 1);
        let metadata = serde_json::json!({ "blob": big });
        assert!(check_metadata_size(&metadata).is_err());
    }

    #[test]
    fn limit_zero_or_negative_clamps_to_one() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
    }

    #[test]
    fn limit_max_clamps_to_cap() {
        assert_eq!(clamp_limit(i64::MAX), crate::constants::MAX_QUERY_LIMIT);
    }

    #[test]
    fn redos_nested_quantifier_rejected() {
        assert!(check_regex_safety("(x+)+").is_err());
        assert!(check_regex_safety("(a*)*").is_err());
    }

    #[test]
    fn redos_overlapping_alternation_rejected() {
        assert!(check_regex_safety("(a|a)+").is_err());
    }

    #[test]
    fn redos_excessive_bounded_repetition_rejected() {
        assert!(check_regex_safety(".{1,20000}").is_err());
    }

    #[test]
    fn safe_pattern_accepted() {
        assert!(check_regex_safety(r"^foo\d{1,4}bar$").is_ok());
    }

    #[test]
    fn tag_normalization_lowercases_and_trims() {
        assert_eq!(normalize_tag("  Security "), "security");
    }
}
