//! Properties of the classifier and tally resolution with stub similarity models.

use async_trait::async_trait;
use risk_profiler::config::ClassifierConfig;
use risk_profiler::session::{Session, record_answer, resolve};
use risk_profiler::similarity::SimilarityScorer;
use risk_profiler::taxonomy::{Category, Taxonomy, TaxonomyId, TaxonomyStore};
use risk_profiler::{Classifier, Result, Vocabulary};
use std::collections::HashMap;
use std::sync::Arc;

/// Scores each exemplar from a table, keyed on the response's first word
struct KeyedScorer(HashMap<(&'static str, &'static str), f32>);

#[async_trait]
impl SimilarityScorer for KeyedScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let key = a.split_whitespace().next().unwrap_or("");
        Ok(self
            .0
            .iter()
            .find(|((k, p), _)| *k == key && *p == b)
            .map_or(0.0, |(_, s)| *s))
    }
}

fn low_high() -> Taxonomy {
    Taxonomy::new(
        TaxonomyId::Risk,
        vec![
            Category::new("A", &["low risk"]),
            Category::new("B", &["high risk"]),
        ],
    )
    .unwrap()
}

fn classifier(table: &[((&'static str, &'static str), f32)], taxonomy: &Taxonomy) -> Classifier {
    Classifier::new(
        Arc::new(KeyedScorer(table.iter().copied().collect())),
        Arc::new(Vocabulary::build([taxonomy])),
        ClassifierConfig::default(),
    )
}

#[tokio::test]
async fn test_low_risk_response_classifies_as_a() {
    let t = low_high();
    let c = classifier(
        &[(("I", "low risk"), 0.85), (("I", "high risk"), 0.1)],
        &t,
    );
    let got = c
        .classify("I prefer low risk investments", &t)
        .await
        .unwrap();
    assert_eq!(got.as_deref(), Some("A"));
}

#[tokio::test]
async fn test_threshold_monotonicity() {
    let t = low_high();
    let c = classifier(
        &[
            (("x", "low risk"), 0.62),
            (("x", "high risk"), 0.74),
            (("y", "low risk"), 0.91),
            (("y", "high risk"), 0.35),
        ],
        &t,
    );
    for text in ["x", "y", "z"] {
        let mut last: Option<String> = c.classify_with_threshold(text, &t, 0.0).await.unwrap();
        for step in 1..=100 {
            let threshold = step as f32 / 100.0;
            let now = c.classify_with_threshold(text, &t, threshold).await.unwrap();
            match (&last, &now) {
                (None, Some(_)) => panic!("{text}: None became a match at {threshold}"),
                (Some(a), Some(b)) => assert_eq!(a, b, "{text}: category changed at {threshold}"),
                _ => {}
            }
            last = now;
        }
    }
}

#[tokio::test]
async fn test_empty_text_never_matches() {
    let store = TaxonomyStore::builtin().unwrap();
    let c = Classifier::new(
        Arc::new(KeyedScorer(HashMap::new())),
        Arc::new(Vocabulary::build(store.all())),
        ClassifierConfig::default(),
    );
    for taxonomy in store.all() {
        for threshold in [0.0, 0.5, 0.7, 0.99] {
            assert_eq!(
                c.classify_with_threshold("", taxonomy, threshold)
                    .await
                    .unwrap(),
                None
            );
        }
    }
}

#[tokio::test]
async fn test_tally_resolution_after_a_a_b() {
    let store = TaxonomyStore::from_toml_str(
        r#"
        [[risk]]
        name = "Conservative"
        exemplars = ["low risk"]

        [[risk]]
        name = "Moderate"
        exemplars = ["some risk"]

        [[risk]]
        name = "Aggressive"
        exemplars = ["high risk"]
        "#,
    )
    .unwrap();
    let c = Classifier::new(
        Arc::new(KeyedScorer(
            [
                (("careful", "low risk"), 0.9),
                (("bold", "high risk"), 0.9),
            ]
            .into_iter()
            .collect(),
        )),
        Arc::new(Vocabulary::build(store.all())),
        ClassifierConfig::default(),
    );

    let mut session = Session::new(3, &store);
    assert_eq!(resolve(&session, TaxonomyId::Risk), "None");

    for (i, text) in ["careful", "careful", "bold"].into_iter().enumerate() {
        record_answer(&mut session, &c, &store, i, text).await.unwrap();
    }
    assert!(session.is_complete());
    assert_eq!(resolve(&session, TaxonomyId::Risk), "Conservative");
    assert_eq!(resolve(&session, TaxonomyId::Bias), "None");
}

#[tokio::test]
async fn test_out_of_order_answer_is_rejected() {
    let store = TaxonomyStore::builtin().unwrap();
    let c = Classifier::new(
        Arc::new(KeyedScorer(HashMap::new())),
        Arc::new(Vocabulary::build(store.all())),
        ClassifierConfig::default(),
    );
    let mut session = Session::new(8, &store);
    let err = record_answer(&mut session, &c, &store, 3, "hello")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("awaiting question 0"));
    assert_eq!(session.current_index(), 0);
}
