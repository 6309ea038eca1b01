use anyhow::{Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::embeddings::Embedder;

const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];
const DEFAULT_MAX_POSITIONS: usize = 512;

/// Sentence embeddings from a local BERT-family model (BGE-small by default),
/// mean-pooled and L2-normalized.
pub struct BGEEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dims: usize,
}

impl BGEEmbedder {
    /// Load model files from `model_dir`; when any is missing and downloads are
    /// allowed, fetch them from the Hugging Face hub repo `repo_id`.
    pub fn load(model_dir: &Path, repo_id: &str, allow_download: bool) -> Result<Self> {
        let files = resolve_model_files(model_dir, repo_id, allow_download)?;
        let device = Device::Cpu;

        let config_str =
            std::fs::read_to_string(&files.config).context("Failed to read config.json")?;
        let config: Config =
            serde_json::from_str(&config_str).context("Failed to parse config.json")?;
        let raw_config: serde_json::Value = serde_json::from_str(&config_str)?;
        let dims = raw_config
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .context("config.json has no hidden_size")? as usize;

        // Long answers are cut to the model's position limit instead of failing
        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_positions(&raw_config),
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        // SAFETY: the safetensors file is memory-mapped read-only and not modified while loaded
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dims,
        })
    }

    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &Tensor) -> Result<Vec<f32>> {
        // [batch, seq] -> [batch, seq, hidden]
        let mask_expanded = attention_mask.unsqueeze(2)?;
        let masked = embeddings.broadcast_mul(&mask_expanded)?;
        let summed = masked.sum(1)?;
        let mask_sum = mask_expanded.sum(1)?;
        let mean = summed.broadcast_div(&mask_sum)?;

        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = mean.broadcast_div(&norm)?;

        Ok(normalized.squeeze(0)?.to_vec1::<f32>()?)
    }
}

/// Sequence length limit from `max_position_embeddings`, 512 when absent
fn max_positions(config: &serde_json::Value) -> usize {
    config
        .get("max_position_embeddings")
        .and_then(|v| v.as_u64())
        .map_or(DEFAULT_MAX_POSITIONS, |n| n as usize)
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

fn resolve_model_files(model_dir: &Path, repo_id: &str, allow_download: bool) -> Result<ModelFiles> {
    let local_complete = MODEL_FILES.iter().all(|f| model_dir.join(f).is_file());
    if local_complete {
        return Ok(ModelFiles {
            config: model_dir.join("config.json"),
            tokenizer: model_dir.join("tokenizer.json"),
            weights: model_dir.join("model.safetensors"),
        });
    }
    if !allow_download {
        anyhow::bail!(
            "Model files missing in {} and downloads are disabled (PROFILER_ALLOW_DOWNLOAD=false)",
            model_dir.display()
        );
    }

    info!(
        "Model files not found in {}, fetching {} from the Hugging Face hub",
        model_dir.display(),
        repo_id
    );
    let api = hf_hub::api::sync::Api::new().context("Failed to initialise Hugging Face hub client")?;
    let repo = api.model(repo_id.to_string());
    Ok(ModelFiles {
        config: repo.get("config.json").context("Failed to fetch config.json")?,
        tokenizer: repo
            .get("tokenizer.json")
            .context("Failed to fetch tokenizer.json")?,
        weights: repo
            .get("model.safetensors")
            .context("Failed to fetch model.safetensors")?,
    })
}

#[async_trait]
impl Embedder for BGEEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Symmetric similarity: no query instruction prefix
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let token_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();
        let type_ids = vec![0u32; token_ids.len()];

        let input_ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_tensor = Tensor::new(
            attention_mask
                .iter()
                .map(|&x| x as f32)
                .collect::<Vec<_>>()
                .as_slice(),
            &self.device,
        )?
        .unsqueeze(0)?;

        let embeddings =
            self.model
                .forward(&input_ids, &token_type_ids, Some(&attention_tensor))?;

        self.mean_pooling(&embeddings, &attention_tensor)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
