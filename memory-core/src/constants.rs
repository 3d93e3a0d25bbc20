//! Size limits, pagination caps, and other numeric constants from spec §6.3.

/// Size limits enforced by validation (spec §6.3 `SIZE_LIMITS`).
pub mod size_limits {
    /// Maximum length of a `name`/slug field.
    pub const NAME_MAX_LENGTH: usize = 200;
    /// Maximum length of a `title` field.
    pub const TITLE_MAX_LENGTH: usize = 300;
    /// Maximum length of a `description` field.
    pub const DESCRIPTION_MAX_LENGTH: usize = 2_000;
    /// Maximum length of a `content` field (guideline/knowledge body text).
    pub const CONTENT_MAX_LENGTH: usize = 50_000;
    /// Maximum serialized size of a `metadata` object, in bytes.
    pub const METADATA_MAX_BYTES: usize = 16_384;
    /// Maximum number of tags attachable to a single entry.
    pub const TAGS_MAX_COUNT: usize = 32;
    /// Maximum number of examples on an entry that supports them.
    pub const EXAMPLES_MAX_COUNT: usize = 20;
    /// Maximum number of items in a single bulk operation.
    pub const BULK_OPERATION_MAX: usize = 500;
    /// Maximum length of a caller-supplied regex pattern, checked before
    /// structural ReDoS inspection.
    pub const REGEX_PATTERN_MAX_LENGTH: usize = 500;
    /// Maximum number of `contextEntries` on a message.
    pub const MESSAGE_CONTEXT_ENTRIES_MAX: usize = 50;
    /// Maximum number of `toolsUsed` on a message.
    pub const MESSAGE_TOOLS_USED_MAX: usize = 100;
}

/// Result pagination caps (spec §4.2).
pub const DEFAULT_QUERY_LIMIT: usize = 20;
pub const MAX_QUERY_LIMIT: usize = 100;
pub const MAX_OFFSET: usize = 10_000;

/// Semantic channel cap (spec §4.2 step 4).
pub const TOP_K_SEMANTIC: usize = 20;

/// Maximum BFS depth for relation traversal (spec §4.2).
pub const MAX_RELATION_DEPTH: usize = 10;

/// Default query-result cache TTL, in seconds (spec §4.2 step 7).
pub const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 300;

/// Default duplicate-similarity threshold for the missed-extraction sweep
/// (spec §4.3.3) and consolidation (spec §4.4).
pub const DUPLICATE_SIMILARITY: f32 = 0.92;

/// Default minimum reward delta between two examples in a DPO pair
/// (spec §4.4).
pub const MIN_REWARD_DELTA: f64 = 0.1;

/// Maximum lease duration for a file lock, in seconds (spec §4.5.2).
pub const MAX_LOCK_EXPIRES_IN_SECS: u64 = 86_400;

/// Default resident-key cap for the local rate limiter's bucket table
/// (spec §4.5.3: "must cap resident keys (LRU eviction once a bound is
/// exceeded)").
pub const DEFAULT_RATE_LIMITER_MAX_KEYS: usize = 10_000;
