//! Per-taxonomy classification of one response by best exemplar similarity.

use crate::config::ClassifierConfig;
use crate::correction::SpellingCorrector;
use crate::error::Result;
use crate::similarity::SimilarityScorer;
use crate::taxonomy::{Taxonomy, TaxonomyId, TaxonomyStore};
use crate::vocabulary::Vocabulary;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Level, debug};

/// Outcome of classifying one response against one taxonomy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub taxonomy: TaxonomyId,
    /// Winning category, `None` when nothing scored above the threshold
    pub category: Option<String>,
    /// Highest similarity seen across all exemplars
    pub score: f32,
}

pub struct Classifier {
    scorer: Arc<dyn SimilarityScorer>,
    vocabulary: Arc<Vocabulary>,
    options: ClassifierConfig,
}

impl Classifier {
    pub fn new(
        scorer: Arc<dyn SimilarityScorer>,
        vocabulary: Arc<Vocabulary>,
        options: ClassifierConfig,
    ) -> Self {
        Self {
            scorer,
            vocabulary,
            options,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.options.threshold
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Spelling-corrected form of `text` against the exemplar vocabulary
    pub fn correct(&self, text: &str) -> String {
        SpellingCorrector::new(&self.vocabulary)
            .with_cutoff(self.options.correction_cutoff)
            .correct(text)
    }

    /// The text that is actually compared with exemplars
    fn scoring_text(&self, text: &str) -> String {
        let debugging = tracing::enabled!(Level::DEBUG);
        if !self.options.score_corrected_text && !debugging {
            return text.to_string();
        }
        let corrected = self.correct(text);
        if debugging && !same_words(&corrected, text) {
            debug!(
                raw = text,
                corrected = corrected.as_str(),
                scored = if self.options.score_corrected_text {
                    "corrected"
                } else {
                    "raw"
                },
                "spelling correction changed the response"
            );
        }
        if self.options.score_corrected_text {
            corrected
        } else {
            text.to_string()
        }
    }

    /// Best category at the configured threshold
    pub async fn classify(&self, text: &str, taxonomy: &Taxonomy) -> Result<Option<String>> {
        self.classify_with_threshold(text, taxonomy, self.options.threshold)
            .await
    }

    pub async fn classify_with_threshold(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        threshold: f32,
    ) -> Result<Option<String>> {
        Ok(self
            .classify_detailed(text, taxonomy, threshold)
            .await?
            .category)
    }

    /// Score every exemplar. The first strictly-highest score wins and must be
    /// strictly above `threshold`. Blank text is never scored.
    pub async fn classify_detailed(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        threshold: f32,
    ) -> Result<ClassificationResult> {
        if text.trim().is_empty() {
            return Ok(ClassificationResult {
                taxonomy: taxonomy.id(),
                category: None,
                score: 0.0,
            });
        }
        let scored = self.scoring_text(text);
        self.best_match(&scored, taxonomy, threshold).await
    }

    async fn best_match(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        threshold: f32,
    ) -> Result<ClassificationResult> {
        let mut best: Option<(&str, f32)> = None;
        for (category, phrase) in taxonomy.exemplars() {
            let score = self.scorer.similarity(text, phrase).await?;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((category, score));
            }
        }
        let score = best.map_or(0.0, |(_, s)| s);
        let category = best
            .filter(|(_, s)| *s > threshold)
            .map(|(c, _)| c.to_string());
        debug!(
            taxonomy = %taxonomy.id(),
            category = category.as_deref().unwrap_or("none"),
            score,
            threshold,
            "classified response"
        );
        Ok(ClassificationResult {
            taxonomy: taxonomy.id(),
            category,
            score,
        })
    }

    /// Classify against every taxonomy in the store, correcting spelling once
    pub async fn classify_all(
        &self,
        text: &str,
        store: &TaxonomyStore,
    ) -> Result<Vec<ClassificationResult>> {
        let mut results = Vec::with_capacity(2);
        if text.trim().is_empty() {
            for taxonomy in store.all() {
                results.push(ClassificationResult {
                    taxonomy: taxonomy.id(),
                    category: None,
                    score: 0.0,
                });
            }
            return Ok(results);
        }
        let scored = self.scoring_text(text);
        for taxonomy in store.all() {
            results.push(
                self.best_match(&scored, taxonomy, self.options.threshold)
                    .await?,
            );
        }
        Ok(results)
    }
}

/// Word-by-word equality, ignoring runs of whitespace
fn same_words(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}
