//! Per-respondent session state and tally aggregation.

use crate::classifier::{ClassificationResult, Classifier};
use crate::error::{ProfilerError, Result};
use crate::taxonomy::{Taxonomy, TaxonomyId, TaxonomyStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Label reported when no answer was ever classified into a taxonomy
pub const NO_MATCH: &str = "None";

/// One submitted answer. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub question_index: usize,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Win counts per category, in the taxonomy's declared order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    counts: Vec<(String, u32)>,
}

impl Tally {
    pub fn for_taxonomy(taxonomy: &Taxonomy) -> Self {
        Self {
            counts: taxonomy.category_names().map(|n| (n.to_string(), 0)).collect(),
        }
    }

    /// Count one win. Unknown names are ignored.
    pub fn increment(&mut self, category: &str) {
        if let Some((_, count)) = self.counts.iter_mut().find(|(n, _)| n == category) {
            *count += 1;
        }
    }

    pub fn count(&self, category: &str) -> u32 {
        self.counts
            .iter()
            .find(|(n, _)| n == category)
            .map_or(0, |(_, c)| *c)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    /// Category with the most wins; earliest declared wins ties; `NO_MATCH`
    /// when every count is zero.
    pub fn winner(&self) -> &str {
        let mut best: Option<(&str, u32)> = None;
        for (name, count) in &self.counts {
            if *count > 0 && best.is_none_or(|(_, c)| *count > c) {
                best = Some((name.as_str(), *count));
            }
        }
        best.map_or(NO_MATCH, |(name, _)| name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    AwaitingAnswer(usize),
    Complete,
}

/// Conversation state for one respondent; owned by the caller and threaded
/// through every engine call.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    index: usize,
    question_count: usize,
    responses: BTreeMap<usize, Response>,
    tallies: BTreeMap<TaxonomyId, Tally>,
}

impl Session {
    pub fn new(question_count: usize, store: &TaxonomyStore) -> Self {
        let tallies = store
            .all()
            .into_iter()
            .map(|t| (t.id(), Tally::for_taxonomy(t)))
            .collect();
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            index: 0,
            question_count,
            responses: BTreeMap::new(),
            tallies,
        }
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn state(&self) -> SessionState {
        if self.index >= self.question_count {
            SessionState::Complete
        } else {
            SessionState::AwaitingAnswer(self.index)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Complete
    }

    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.responses.values()
    }

    pub fn response(&self, index: usize) -> Option<&Response> {
        self.responses.get(&index)
    }

    pub fn tally(&self, taxonomy: TaxonomyId) -> Option<&Tally> {
        self.tallies.get(&taxonomy)
    }

    /// Store the answer, count each winning category and advance the index.
    /// `index` must be the question the session is waiting on; stored
    /// responses are never replaced.
    pub fn apply(
        &mut self,
        index: usize,
        text: &str,
        outcomes: &[ClassificationResult],
    ) -> Result<()> {
        self.expect_index(index)?;
        self.responses.insert(
            index,
            Response {
                question_index: index,
                text: text.to_string(),
                recorded_at: Utc::now(),
            },
        );
        for outcome in outcomes {
            if let Some(category) = &outcome.category
                && let Some(tally) = self.tallies.get_mut(&outcome.taxonomy)
            {
                tally.increment(category);
            }
        }
        self.index = index + 1;
        if self.is_complete() {
            info!(session = %self.id, "session complete");
        }
        Ok(())
    }

    fn expect_index(&self, index: usize) -> Result<()> {
        match self.state() {
            SessionState::Complete => Err(ProfilerError::SessionComplete {
                total: self.question_count,
            }),
            SessionState::AwaitingAnswer(expected) if expected != index => {
                Err(ProfilerError::Validation {
                    message: format!(
                        "answer for question {} submitted while awaiting question {}",
                        index, expected
                    ),
                })
            }
            SessionState::AwaitingAnswer(_) => Ok(()),
        }
    }
}

/// Classify `text` against every taxonomy and fold the outcome into the
/// session. `index` must be the question the session is waiting on.
pub async fn record_answer(
    session: &mut Session,
    classifier: &Classifier,
    store: &TaxonomyStore,
    index: usize,
    text: &str,
) -> Result<Vec<ClassificationResult>> {
    // Reject stale answers before any model call
    session.expect_index(index)?;

    let outcomes = classifier.classify_all(text, store).await?;
    debug!(
        session = %session.id,
        question = index,
        outcomes = ?outcomes,
        "recording answer"
    );
    session.apply(index, text, &outcomes)?;
    Ok(outcomes)
}

/// Dominant category of `taxonomy` so far, or `NO_MATCH`
pub fn resolve(session: &Session, taxonomy: TaxonomyId) -> String {
    session
        .tally(taxonomy)
        .map(|t| t.winner())
        .unwrap_or(NO_MATCH)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Category;

    fn outcome(taxonomy: TaxonomyId, category: Option<&str>) -> ClassificationResult {
        ClassificationResult {
            taxonomy,
            category: category.map(str::to_string),
            score: 0.9,
        }
    }

    fn builtin_store() -> TaxonomyStore {
        TaxonomyStore::builtin().unwrap()
    }

    #[test]
    fn tally_majority_wins() {
        let t = Taxonomy::new(
            TaxonomyId::Risk,
            vec![Category::new("A", &["a"]), Category::new("B", &["b"])],
        )
        .unwrap();
        let mut tally = Tally::for_taxonomy(&t);
        assert_eq!(tally.winner(), NO_MATCH);
        tally.increment("A");
        tally.increment("A");
        tally.increment("B");
        assert_eq!(tally.winner(), "A");
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn tally_ties_follow_declared_order() {
        let t = Taxonomy::new(
            TaxonomyId::Risk,
            vec![Category::new("A", &["a"]), Category::new("B", &["b"])],
        )
        .unwrap();
        let mut tally = Tally::for_taxonomy(&t);
        tally.increment("B");
        tally.increment("A");
        assert_eq!(tally.winner(), "A");
        tally.increment("unknown");
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn resolve_without_classified_answers_is_none_sentinel() {
        let store = builtin_store();
        let mut session = Session::new(8, &store);
        session
            .apply(0, "hmm", &[outcome(TaxonomyId::Risk, None)])
            .unwrap();
        assert_eq!(resolve(&session, TaxonomyId::Risk), "None");
        assert_eq!(resolve(&session, TaxonomyId::Bias), "None");
    }

    #[test]
    fn apply_advances_and_counts() {
        let store = builtin_store();
        let mut session = Session::new(2, &store);
        assert_eq!(session.state(), SessionState::AwaitingAnswer(0));
        session.apply(
            0,
            "bonds only",
            &[
                outcome(TaxonomyId::Risk, Some("Conservative")),
                outcome(TaxonomyId::Bias, None),
            ],
        )
        .unwrap();
        assert_eq!(session.state(), SessionState::AwaitingAnswer(1));
        session.apply(
            1,
            "big bets",
            &[
                outcome(TaxonomyId::Risk, Some("Aggressive")),
                outcome(TaxonomyId::Bias, Some("Overconfidence Bias")),
            ],
        )
        .unwrap();
        assert!(session.is_complete());
        assert_eq!(resolve(&session, TaxonomyId::Risk), "Conservative");
        assert_eq!(resolve(&session, TaxonomyId::Bias), "Overconfidence Bias");
        assert_eq!(session.response(1).unwrap().text, "big bets");
        assert_eq!(session.responses().count(), 2);
    }

    #[test]
    fn apply_rejects_skipped_replayed_and_late_indices() {
        let store = builtin_store();
        let mut session = Session::new(2, &store);
        let risky = [outcome(TaxonomyId::Risk, Some("Aggressive"))];

        let err = session.apply(5, "skip ahead", &risky).unwrap_err();
        assert!(matches!(err, ProfilerError::Validation { .. }));
        assert_eq!(session.current_index(), 0);

        session.apply(0, "zero", &risky).unwrap();
        let err = session.apply(0, "overwritten", &risky).unwrap_err();
        assert!(matches!(err, ProfilerError::Validation { .. }));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.response(0).unwrap().text, "zero");
        assert_eq!(session.tally(TaxonomyId::Risk).unwrap().count("Aggressive"), 1);

        session.apply(1, "one", &[]).unwrap();
        let err = session.apply(0, "again", &risky).unwrap_err();
        assert!(matches!(err, ProfilerError::SessionComplete { total: 2 }));
        assert_eq!(session.responses().count(), 2);
        assert_eq!(session.tally(TaxonomyId::Risk).unwrap().total(), 1);
    }
}
