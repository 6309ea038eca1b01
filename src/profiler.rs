//! In-process interface consumed by the interaction layer: start a session,
//! poll for the next question, submit answers, read the final profile.

use crate::classifier::Classifier;
use crate::config::{ClassifierConfig, Config};
use crate::embeddings::create_embedder;
use crate::error::{ProfilerError, Result};
use crate::questions::{Question, Questionnaire};
use crate::session::{Session, record_answer, resolve};
use crate::similarity::{EmbeddingScorer, SimilarityScorer};
use crate::taxonomy::{TaxonomyId, TaxonomyStore};
use crate::vocabulary::Vocabulary;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Warning returned for blank answers
pub const BLANK_ANSWER_WARNING: &str = "Please enter a valid response.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub question_index: usize,
    pub question_text: String,
    pub answer_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileResults {
    pub risk_label: String,
    pub bias_label: String,
    pub transcript: Vec<TranscriptEntry>,
}

/// Shared, read-only engine. Sessions are owned by callers.
pub struct Profiler {
    store: Arc<TaxonomyStore>,
    questionnaire: Questionnaire,
    classifier: Classifier,
}

impl Profiler {
    pub fn new(
        store: TaxonomyStore,
        questionnaire: Questionnaire,
        scorer: Arc<dyn SimilarityScorer>,
        options: ClassifierConfig,
    ) -> Self {
        let vocabulary = Arc::new(Vocabulary::build(store.all()));
        let classifier = Classifier::new(scorer, vocabulary, options);
        Self {
            store: Arc::new(store),
            questionnaire,
            classifier,
        }
    }

    /// Load taxonomies and the embedding model, then pre-embed every exemplar.
    /// Any failure here is fatal: the engine never serves without its model.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = TaxonomyStore::load(config.runtime.taxonomy_path.as_deref())?;

        let embedder =
            create_embedder(config)
                .await
                .map_err(|e| ProfilerError::EmbedderUnavailable {
                    message: format!("{:#}", e),
                })?;

        let cache_max = config.runtime.cache_max.max(store.exemplar_count() + 64);
        if cache_max > config.runtime.cache_max {
            warn!(
                "PROFILER_CACHE_MAX {} is below the exemplar count, raised to {}",
                config.runtime.cache_max, cache_max
            );
        }
        let scorer = Arc::new(EmbeddingScorer::new(embedder, cache_max));
        let warmed = scorer
            .warm(
                store
                    .all()
                    .into_iter()
                    .flat_map(|t| t.exemplars().map(|(_, phrase)| phrase)),
            )
            .await
            .map_err(|e| ProfilerError::EmbedderUnavailable {
                message: e.to_string(),
            })?;
        info!(
            "Profiler ready: {} exemplars embedded ({} dims), threshold {}",
            warmed,
            scorer.dimensions(),
            config.classifier.threshold
        );

        Ok(Self::new(
            store,
            Questionnaire::standard(),
            scorer,
            config.classifier.clone(),
        ))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn store(&self) -> &TaxonomyStore {
        &self.store
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn start_session(&self) -> Session {
        let session = Session::new(self.questionnaire.len(), &self.store);
        info!(session = %session.id, "session started");
        session
    }

    /// Question at the session's current index, `None` once complete
    pub fn next_question(&self, session: &Session) -> Option<&Question> {
        if session.is_complete() {
            return None;
        }
        self.questionnaire.get(session.current_index())
    }

    /// Blank answers are rejected with a warning and leave the session where
    /// it was; anything else is classified and advances the session.
    pub async fn submit_answer(&self, session: &mut Session, text: &str) -> Result<Submission> {
        if session.is_complete() {
            return Err(ProfilerError::SessionComplete {
                total: session.question_count(),
            });
        }
        if text.trim().is_empty() {
            return Ok(Submission {
                accepted: false,
                warning: Some(BLANK_ANSWER_WARNING.to_string()),
            });
        }
        let index = session.current_index();
        record_answer(session, &self.classifier, &self.store, index, text).await?;
        Ok(Submission {
            accepted: true,
            warning: None,
        })
    }

    /// Final labels and transcript; only valid on a complete session
    pub fn results(&self, session: &Session) -> Result<ProfileResults> {
        if !session.is_complete() {
            return Err(ProfilerError::SessionIncomplete {
                answered: session.current_index(),
                total: session.question_count(),
            });
        }
        let transcript = session
            .responses()
            .map(|r| TranscriptEntry {
                question_index: r.question_index,
                question_text: self
                    .questionnaire
                    .get(r.question_index)
                    .map(|q| q.text.clone())
                    .unwrap_or_default(),
                answer_text: r.text.clone(),
            })
            .collect();
        Ok(ProfileResults {
            risk_label: resolve(session, TaxonomyId::Risk),
            bias_label: resolve(session, TaxonomyId::Bias),
            transcript,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Zero;

    #[async_trait]
    impl SimilarityScorer for Zero {
        async fn similarity(&self, _a: &str, _b: &str) -> Result<f32> {
            Ok(0.0)
        }
    }

    fn profiler() -> Profiler {
        Profiler::new(
            TaxonomyStore::builtin().unwrap(),
            Questionnaire::from_texts(["first?", "second?"]),
            Arc::new(Zero),
            ClassifierConfig::default(),
        )
    }

    #[tokio::test]
    async fn blank_answer_is_a_warning_not_an_advance() {
        let p = profiler();
        let mut s = p.start_session();
        let sub = p.submit_answer(&mut s, "   ").await.unwrap();
        assert!(!sub.accepted);
        assert_eq!(sub.warning.as_deref(), Some(BLANK_ANSWER_WARNING));
        assert_eq!(s.current_index(), 0);
        assert_eq!(p.next_question(&s).unwrap().text, "first?");
    }

    #[tokio::test]
    async fn unmatched_answers_resolve_to_sentinel() {
        let p = profiler();
        let mut s = p.start_session();
        assert!(p.submit_answer(&mut s, "no idea").await.unwrap().accepted);
        assert!(matches!(
            p.results(&s),
            Err(ProfilerError::SessionIncomplete {
                answered: 1,
                total: 2
            })
        ));
        p.submit_answer(&mut s, "still none").await.unwrap();
        assert!(p.next_question(&s).is_none());
        let results = p.results(&s).unwrap();
        assert_eq!(results.risk_label, "None");
        assert_eq!(results.bias_label, "None");
        assert_eq!(results.transcript.len(), 2);
        assert_eq!(results.transcript[1].question_text, "second?");
    }

    #[tokio::test]
    async fn submitting_after_completion_fails() {
        let p = profiler();
        let mut s = p.start_session();
        p.submit_answer(&mut s, "a").await.unwrap();
        p.submit_answer(&mut s, "b").await.unwrap();
        let err = p.submit_answer(&mut s, "c").await.unwrap_err();
        assert!(matches!(err, ProfilerError::SessionComplete { total: 2 }));
    }
}
