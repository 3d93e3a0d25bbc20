//! Narrow embedding capability consumed by the query pipeline's semantic
//! channel and by consolidation/duplicate-detection (spec §9 "Optional
//! language-model adapter": treat embedding/LM providers as narrow
//! capabilities with `isAvailable()` and a non-provider fallback always
//! available to the caller).
//!
//! Grounded in the teacher's `memory-core::embeddings::provider::EmbeddingProvider`
//! trait shape; concrete vendor backends (OpenAI/Mistral/local ONNX model)
//! are explicitly out of spec scope (§1) so only the trait and a
//! deterministic mock implementation live here.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// A text-to-vector capability. Every caller must have a working path when
/// `is_available()` is false (spec §9).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>>;

    /// Embed a batch of texts. Default implementation embeds sequentially;
    /// a real provider overrides this with a true batch call.
    async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Whether this provider is currently reachable. The query pipeline's
    /// semantic channel is only opened when this returns `true`.
    fn is_available(&self) -> bool;
}

/// Deterministic hash-based embedding, standing in for a real model so the
/// rest of the pipeline (semantic channel, duplicate grouping) has
/// something to exercise without a network dependency. Same text always
/// produces the same vector; different texts produce very different
/// vectors with high probability, which is all the consuming code needs.
pub struct MockEmbeddingProvider {
    dimension: usize,
    available: std::sync::atomic::AtomicBool,
    calls: AtomicU64,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            available: std::sync::atomic::AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }

    /// Flip availability, used by tests exercising the `DependencyUnavailable`
    /// degraded path (spec §4.2 failure semantics).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dimension];
        let normalized = text.to_lowercase();
        for (i, token) in normalized.split_whitespace().enumerate() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::hash::Hash::hash(&token, &mut hasher);
            std::hash::Hash::hash(&i, &mut hasher);
            let h = std::hash::Hasher::finish(&hasher);
            let slot = (h as usize) % self.dimension;
            out[slot] += 1.0;
        }
        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut out {
                *x /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(crate::error::Error::DependencyUnavailable {
                dependency: "embedding".to_string(),
            });
        }
        Ok(self.hash_embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed("fix the auth bug").await.unwrap();
        let b = provider.embed("fix the auth bug").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unavailable_provider_returns_dependency_unavailable() {
        let provider = MockEmbeddingProvider::new(32);
        provider.set_available(false);
        let err = provider.embed("x").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::DependencyUnavailable { .. }));
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let provider = MockEmbeddingProvider::new(16);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_ne!(embeddings[0], embeddings[1]);
    }
}
