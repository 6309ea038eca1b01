use crate::config::{Config, DEFAULT_OPENAI_DIMENSIONS, openai_dimensions};
use crate::vocabulary::tokenize;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Remote embeddings from the OpenAI API. Transient failures (transport
/// errors, 429 and 5xx) are retried with exponential backoff; other client
/// errors fail immediately.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

/// One failed request, tagged with whether another attempt can help
struct AttemptError {
    error: anyhow::Error,
    retryable: bool,
}

impl AttemptError {
    fn retryable(error: anyhow::Error) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn fatal(error: anyhow::Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(200u64 << attempt.min(6))
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// First embedding of a response body, checked against the expected size
fn first_embedding(response: EmbeddingResponse, dims: usize) -> Result<Vec<f32>> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|item| item.embedding)
        .context("No embedding returned from OpenAI")?;
    if embedding.len() != dims {
        anyhow::bail!(
            "OpenAI returned {} dimensions, expected {}",
            embedding.len(),
            dims
        );
    }
    Ok(embedding)
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, model: String, dims: Option<usize>, retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build reqwest client with timeout")?;
        let dims = dims
            .or_else(|| openai_dimensions(&model))
            .unwrap_or(DEFAULT_OPENAI_DIMENSIONS);
        Ok(Self {
            client,
            api_key,
            model,
            dims,
            retries: retries.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, text: &str) -> std::result::Result<Vec<f32>, AttemptError> {
        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| AttemptError::retryable(anyhow::Error::new(e).context("OpenAI request failed")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = anyhow::anyhow!("OpenAI API error {}: {}", status, body);
            return Err(if is_retryable_status(status) {
                AttemptError::retryable(error)
            } else {
                AttemptError::fatal(error)
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AttemptError::retryable(anyhow::Error::new(e).context("Failed to parse OpenAI response"))
        })?;
        first_embedding(parsed, self.dims).map_err(AttemptError::fatal)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "requesting OpenAI embedding");
        let mut attempt = 0;
        loop {
            match self.attempt(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(failure) if failure.retryable && attempt + 1 < self.retries => {
                    warn!(attempt, "OpenAI embedding failed, retrying: {:#}", failure.error);
                    tokio::time::sleep(backoff(attempt)).await;
                    attempt += 1;
                }
                Err(failure) => {
                    return Err(failure
                        .error
                        .context(format!("OpenAI embedding failed after {} attempt(s)", attempt + 1)));
                }
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Deterministic averaged word vectors: every token maps to a fixed
/// pseudo-random unit direction derived from its blake3 hash, and a text is
/// the normalized mean of its tokens. Cosine similarity then tracks shared
/// vocabulary. No model files, no network.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: Option<usize>) -> Self {
        Self {
            dims: dims.unwrap_or(256).max(1),
        }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"token:");
        hasher.update(token.as_bytes());
        let mut reader = hasher.finalize_xof();
        let mut bytes = vec![0u8; self.dims * 4];
        reader.fill(&mut bytes);
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let mut b4 = [0u8; 4];
                b4.copy_from_slice(chunk);
                let v01 = (u32::from_le_bytes(b4) as f32) / (u32::MAX as f32 + 1.0);
                v01 * 2.0 - 1.0
            })
            .collect()
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            for (acc, v) in out.iter_mut().zip(self.token_vector(&token)) {
                *acc += v;
            }
        }
        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// Factory function to create embedder from configuration. There is no silent
// fallback: a provider that cannot be loaded is a startup failure.
pub async fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let is_placeholder = |s: &str| {
        let t = s.trim();
        t.is_empty()
            || t.contains("${")
            || t.eq_ignore_ascii_case("your-api-key-here")
            || t.eq_ignore_ascii_case("changeme")
    };

    match config.system.embedding_provider.as_str() {
        "openai" => {
            let key = config.runtime.openai_api_key.clone().unwrap_or_default();
            if is_placeholder(&key) {
                anyhow::bail!("embedding provider is openai but OPENAI_API_KEY is not set");
            }
            let model = config.system.embedding_model.clone();
            info!("Using OpenAI embeddings (model={})", model);
            Ok(Arc::new(OpenAIEmbedder::new(
                key,
                model,
                Some(config.system.embedding_dimensions),
                config.system.embed_retries,
            )?))
        }
        "candle" | "local" => {
            let embedder = crate::bge_embedder::BGEEmbedder::load(
                &config.system.model_dir,
                &config.system.embedding_model,
                config.runtime.allow_download,
            )
            .context("Failed to load local BGE embedding model")?;
            info!(
                "Using local BGE embeddings (model={}, dims={})",
                config.system.embedding_model,
                embedder.dimensions()
            );
            Ok(Arc::new(embedder))
        }
        "hashing" => {
            let embedder = HashingEmbedder::new(Some(config.system.embedding_dimensions));
            info!(
                "Using HashingEmbedder (deterministic) with {} dimensions",
                embedder.dimensions()
            );
            Ok(Arc::new(embedder))
        }
        other => anyhow::bail!("Unknown embedding provider '{}'", other),
    }
}
