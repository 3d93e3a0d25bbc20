//! Typed configuration mirroring spec §6.3's recognized-options table.
//!
//! Loading from file/env is out of scope (spec §1); these structs only
//! define the shape and sane defaults, matching the teacher's
//! `MemoryConfig`/`StorageConfig` style (`types::config`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoContextConfig {
    pub enabled: bool,
    pub auto_session: bool,
    pub default_agent_id: String,
    pub cache_ttl_ms: u64,
}

impl Default for AutoContextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_session: true,
            default_agent_id: "default-agent".to_string(),
            cache_ttl_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheCoordinatorConfig {
    pub pressure_threshold: f64,
    pub eviction_target: f64,
    pub total_limit_mb: f64,
    pub check_interval_ms: u64,
}

impl Default for CacheCoordinatorConfig {
    fn default() -> Self {
        Self {
            pressure_threshold: 0.8,
            eviction_target: 0.7,
            total_limit_mb: 256.0,
            check_interval_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfigOptions {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfigOptions {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "mock-embed-v1".to_string(),
            dimension: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub enabled: bool,
    pub top_k: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: crate::constants::TOP_K_SEMANTIC,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRewriteConfig {
    pub enabled: bool,
}

impl Default for QueryRewriteConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub high_confidence_threshold: f64,
    pub low_confidence_threshold: f64,
    pub enable_llm_fallback: bool,
    pub prefer_llm: bool,
    pub max_pattern_boost: f64,
    pub max_pattern_penalty: f64,
    pub learning_rate: f64,
    pub feedback_decay_days: i64,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: 0.9,
            low_confidence_threshold: 0.6,
            enable_llm_fallback: false,
            prefer_llm: false,
            max_pattern_boost: 0.15,
            max_pattern_penalty: 0.3,
            learning_rate: 0.1,
            feedback_decay_days: 30,
            cache_size: 200,
            cache_ttl_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimiterMode {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimiterFailMode {
    Closed,
    LocalFallback,
    Open,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub mode: RateLimiterMode,
    pub fail_mode: RateLimiterFailMode,
    pub max_requests: u32,
    pub window_ms: u64,
    pub min_burst_protection: Option<u32>,
    /// Resident key cap for the local limiter's bucket table (spec §4.5.3:
    /// "must cap resident keys"). Keys beyond this are evicted LRU.
    pub max_tracked_keys: usize,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            mode: RateLimiterMode::Local,
            fail_mode: RateLimiterFailMode::LocalFallback,
            max_requests: 100,
            window_ms: 60_000,
            min_burst_protection: None,
            max_tracked_keys: crate::constants::DEFAULT_RATE_LIMITER_MAX_KEYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_query_limit: usize,
    pub max_query_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_query_limit: crate::constants::DEFAULT_QUERY_LIMIT,
            max_query_limit: crate::constants::MAX_QUERY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateConfig {
    pub duplicate_similarity: f64,
    pub max_iterations: usize,
    pub min_community_size: usize,
    pub random_seed: u64,
    pub min_reward_delta: f64,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            duplicate_similarity: f64::from(crate::constants::DUPLICATE_SIMILARITY),
            max_iterations: 20,
            min_community_size: 2,
            random_seed: 42,
            min_reward_delta: crate::constants::MIN_REWARD_DELTA,
        }
    }
}

/// Top-level configuration, mirroring the spec §6.3 table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub auto_context: AutoContextConfig,
    pub cache: CacheCoordinatorConfig,
    pub embedding: EmbeddingConfigOptions,
    pub rerank: RerankConfig,
    pub query_rewrite: QueryRewriteConfig,
    pub classification: ClassificationConfig,
    pub rate_limiter: RateLimiterConfig,
    pub query: QueryConfig,
    pub consolidate: ConsolidateConfig,
}
