pub mod bge_embedder;
pub mod classifier;
pub mod config;
pub mod correction;
pub mod embeddings;
pub mod error;
pub mod profiler;
pub mod questions;
pub mod session;
pub mod similarity;
pub mod taxonomy;
pub mod utils;
pub mod vocabulary;

pub use classifier::{ClassificationResult, Classifier};
pub use config::Config;
pub use error::{ProfilerError, Result};
pub use profiler::{ProfileResults, Profiler, Submission, TranscriptEntry};
pub use questions::{Question, Questionnaire};
pub use session::{NO_MATCH, Session, SessionState};
pub use taxonomy::{Category, Taxonomy, TaxonomyId, TaxonomyStore};
pub use vocabulary::Vocabulary;
