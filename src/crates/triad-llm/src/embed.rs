//! `Embedder` trait and the deterministic default implementation.
//!
//! The semantic router scores triad routes by cosine similarity between the
//! user's prompt embedding and each triad's combined description+examples
//! embedding. [`HashEmbedder`] produces stable, dependency-free vectors so
//! routing determinism (same prompt + same routes -> same ordering, every
//! run) holds without bundling a real sentence-embedding model.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The default embedding dimension, matching the 384-dim vectors produced
/// by the sentence-transformer model the router was originally built on.
pub const DEFAULT_DIMENSION: usize = 384;

/// Produces embeddings for router inputs.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts. Default implementation embeds sequentially;
    /// providers with a real batch endpoint should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// The dimensionality of vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// A short model identifier for telemetry.
    fn model_name(&self) -> &str;
}

/// Deterministic hash-based embedder.
///
/// Not a semantic model: two unrelated sentences that happen to hash close
/// together will score as similar. It exists so the router's scoring,
/// threshold, and grace-period logic can be built and tested without a
/// network call or a bundled model file; production deployments should
/// supply a real embedder over HTTP via [`crate::provider`].
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let val = ((hash.wrapping_mul(i as u64 + 1)) % 1000) as f32 / 1000.0;
            embedding.push(val * 2.0 - 1.0);
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}
