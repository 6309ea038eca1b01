//! Domain-specific error types for risk-profiler

use thiserror::Error;

/// Main error type for the profiling engine
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Taxonomy error: {message}")]
    Taxonomy { message: String },

    #[error("Embedding provider error: {message}")]
    Embedding { message: String },

    #[error("Embedder unavailable: {message}")]
    EmbedderUnavailable { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Session incomplete: {answered} of {total} questions answered")]
    SessionIncomplete { answered: usize, total: usize },

    #[error("Session complete: all {total} questions already answered")]
    SessionComplete { total: usize },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for ProfilerError {
    fn from(err: anyhow::Error) -> Self {
        ProfilerError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProfilerError {
    fn from(err: serde_json::Error) -> Self {
        ProfilerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ProfilerError {
    fn from(err: toml::de::Error) -> Self {
        ProfilerError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}

impl From<reqwest::Error> for ProfilerError {
    fn from(err: reqwest::Error) -> Self {
        ProfilerError::Embedding {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl ProfilerError {
    /// True for errors that must stop the process before it serves any session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProfilerError::Config { .. }
                | ProfilerError::Taxonomy { .. }
                | ProfilerError::EmbedderUnavailable { .. }
        )
    }
}

/// Result type alias for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;
