//! Semantic similarity between two texts, backed by an embedding model.

use crate::embeddings::Embedder;
use crate::error::{ProfilerError, Result};
use crate::utils::unit_similarity;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Symmetric similarity in [0, 1]
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32>;
}

/// Cosine similarity of embeddings, clamped to [0, 1].
///
/// Embeddings are memoized in a bounded LRU keyed by the exact text, so
/// exemplar phrases are embedded once and each answer costs one model call.
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
    cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>, cache_max: usize) -> Self {
        Self {
            embedder,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache_max).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Embedding for `text`, from cache when available
    pub async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        if let Some(hit) = self.cache.lock().await.get(text) {
            return Ok(hit.clone());
        }
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| ProfilerError::Embedding {
                message: e.to_string(),
            })?;
        if vector.len() != self.embedder.dimensions() {
            return Err(ProfilerError::Embedding {
                message: format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.embedder.dimensions(),
                    vector.len()
                ),
            });
        }
        let vector = Arc::new(vector);
        self.cache.lock().await.put(text.to_string(), vector.clone());
        Ok(vector)
    }

    /// Pre-embed `texts` so later lookups hit the cache
    pub async fn warm<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Result<usize> {
        let mut count = 0usize;
        for text in texts {
            self.embedding(text).await?;
            count += 1;
        }
        debug!("Warmed embedding cache with {} texts", count);
        Ok(count)
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl SimilarityScorer for EmbeddingScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let va = self.embedding(a).await?;
        let vb = self.embedding(b).await?;
        Ok(unit_similarity(&va, &vb))
    }
}
