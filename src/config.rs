use crate::correction::DEFAULT_CORRECTION_CUTOFF;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure loaded from risk_profiler.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// System-level configuration for the embedding model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub embed_retries: u32,
    pub model_dir: PathBuf,
}

/// Embedding configuration snapshot for use across components
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub retries: u32,
}

/// Matching thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// A category wins only with a similarity strictly above this
    pub threshold: f32,
    /// Spelling replacement needs a fuzzy score strictly above this (0-100)
    pub correction_cutoff: u8,
    /// Score the spelling-corrected text instead of the raw answer
    pub score_corrected_text: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            correction_cutoff: DEFAULT_CORRECTION_CUTOFF,
            score_corrected_text: true,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
    pub cache_max: usize,
    pub openai_api_key: Option<String>,
    pub taxonomy_path: Option<PathBuf>,
    pub allow_download: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "risk_profiler=info".to_string(),
            cache_max: 512,
            openai_api_key: None,
            taxonomy_path: None,
            allow_download: true,
        }
    }
}

const KNOWN_PROVIDERS: [&str; 4] = ["candle", "local", "openai", "hashing"];

pub const DEFAULT_BGE_MODEL: &str = "BAAI/bge-small-en-v1.5";
pub const BGE_DIMENSIONS: usize = 384;
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMENSIONS: usize = 1536;

/// Native output size of the OpenAI embedding models we know
pub fn openai_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(DEFAULT_OPENAI_DIMENSIONS),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

fn is_openai_model(model: &str) -> bool {
    model.starts_with("text-embedding-")
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Load `.env` (or `PROFILER_ENV_FILE`) into the process environment.
/// Variables already set are left alone, so repeated calls are harmless.
pub fn load_env_file() {
    let path = std::env::var("PROFILER_ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    let _ = dotenvy::from_path(path);
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses RISK_PROFILER_CONFIG environment variable or defaults to "risk_profiler.toml"
    pub fn load() -> anyhow::Result<Self> {
        load_env_file();

        let config_path = std::env::var("RISK_PROFILER_CONFIG")
            .unwrap_or_else(|_| "risk_profiler.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Env-first overrides for the TOML-backed sections
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("PROFILER_EMBED_PROVIDER")
            && !provider.trim().is_empty()
        {
            self.system.embedding_provider = provider.trim().to_lowercase();
            tracing::debug!("PROFILER_EMBED_PROVIDER env override applied");
        }
        if let Ok(model) = std::env::var("PROFILER_EMBED_MODEL")
            && !model.trim().is_empty()
        {
            self.system.embedding_model = model;
        }
        if let Some(dim) = std::env::var("PROFILER_EMBED_DIM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.system.embedding_dimensions = dim;
        }
        if let Some(retries) = std::env::var("PROFILER_EMBED_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.system.embed_retries = retries;
        }
        if let Ok(dir) = std::env::var("PROFILER_MODEL_DIR") {
            self.system.model_dir = PathBuf::from(dir);
        }
        if let Some(threshold) = std::env::var("PROFILER_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
        {
            self.classifier.threshold = threshold;
        }
        if let Some(cutoff) = std::env::var("PROFILER_CORRECTION_CUTOFF")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
        {
            self.classifier.correction_cutoff = cutoff;
        }
        if let Some(flag) = env_flag("PROFILER_SCORE_CORRECTED") {
            self.classifier.score_corrected_text = flag;
        }
    }

    /// Validate ranges and provider/dimension coherence, clamping where harmless
    pub fn validate(&mut self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.classifier.threshold) {
            anyhow::bail!(
                "classifier.threshold must be between 0.0 and 1.0, got {}",
                self.classifier.threshold
            );
        }
        if self.classifier.correction_cutoff > 100 {
            anyhow::bail!(
                "classifier.correction_cutoff must be between 0 and 100, got {}",
                self.classifier.correction_cutoff
            );
        }
        if self.runtime.cache_max == 0 {
            anyhow::bail!("PROFILER_CACHE_MAX must be greater than 0");
        }

        if self.system.embed_retries == 0 {
            self.system.embed_retries = 1;
        } else if self.system.embed_retries > 10 {
            tracing::warn!(
                "embed_retries {} exceeds max 10, clamping to 10",
                self.system.embed_retries
            );
            self.system.embed_retries = 10;
        }

        let provider = self.system.embedding_provider.clone();
        let provider = provider.as_str();
        if !KNOWN_PROVIDERS.contains(&provider) {
            anyhow::bail!(
                "Unknown embedding provider '{}' (expected one of: {})",
                provider,
                KNOWN_PROVIDERS.join(", ")
            );
        }
        match provider {
            "openai" => self.coerce_openai_model()?,
            "candle" | "local" => {
                if is_openai_model(&self.system.embedding_model) {
                    tracing::warn!(
                        "Model '{}' is an OpenAI model; provider {} uses {} ({} dims)",
                        self.system.embedding_model,
                        provider,
                        DEFAULT_BGE_MODEL,
                        BGE_DIMENSIONS
                    );
                    self.system.embedding_model = DEFAULT_BGE_MODEL.to_string();
                    self.system.embedding_dimensions = BGE_DIMENSIONS;
                }
                if !self.system.embedding_model.ends_with("bge-small-en-v1.5") {
                    tracing::warn!(
                        "Candle/local provider expects 'bge-small-en-v1.5' model, got '{}'",
                        self.system.embedding_model
                    );
                }
                if self.system.embedding_dimensions != BGE_DIMENSIONS {
                    tracing::warn!(
                        "Candle/local BGE model expects {} dimensions, got {}",
                        BGE_DIMENSIONS,
                        self.system.embedding_dimensions
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Switching to openai from a local model picks the default OpenAI model.
    /// A known OpenAI model with the wrong dimension count is rejected.
    fn coerce_openai_model(&mut self) -> anyhow::Result<()> {
        if !is_openai_model(&self.system.embedding_model) {
            tracing::warn!(
                "Model '{}' is not an OpenAI embedding model; using {} ({} dims)",
                self.system.embedding_model,
                DEFAULT_OPENAI_MODEL,
                DEFAULT_OPENAI_DIMENSIONS
            );
            self.system.embedding_model = DEFAULT_OPENAI_MODEL.to_string();
            self.system.embedding_dimensions = DEFAULT_OPENAI_DIMENSIONS;
            return Ok(());
        }
        match openai_dimensions(&self.system.embedding_model) {
            Some(d) if d != self.system.embedding_dimensions => anyhow::bail!(
                "OpenAI {} returns {} dimensions, but embedding_dimensions is {}",
                self.system.embedding_model,
                d,
                self.system.embedding_dimensions
            ),
            Some(_) => {}
            None => tracing::warn!(
                "Unknown OpenAI embedding model '{}', dimension validation skipped",
                self.system.embedding_model
            ),
        }
        Ok(())
    }

    /// Convenience: snapshot embedding configuration
    pub fn embedding(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: self.system.embedding_provider.clone(),
            model: self.system.embedding_model.clone(),
            dimensions: self.system.embedding_dimensions,
            retries: self.system.embed_retries,
        }
    }

    /// Defaults with the offline hashing embedder; used by tests and the CLI `--provider hashing`
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.system.embedding_provider = "hashing".to_string();
        config.system.embedding_model = "hashed-bag-of-words".to_string();
        config.system.embedding_dimensions = 256;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemConfig {
                embedding_provider: "candle".to_string(),
                embedding_model: DEFAULT_BGE_MODEL.to_string(),
                embedding_dimensions: BGE_DIMENSIONS,
                embed_retries: 3,
                model_dir: PathBuf::from("./models/bge-small-en-v1.5"),
            },
            classifier: ClassifierConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "risk_profiler=info".to_string()),
            cache_max: std::env::var("PROFILER_CACHE_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(512),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            taxonomy_path: std::env::var("PROFILER_TAXONOMY_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            allow_download: env_flag("PROFILER_ALLOW_DOWNLOAD").unwrap_or(true),
        }
    }
}
