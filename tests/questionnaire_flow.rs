//! End-to-end questionnaire runs through the public engine API.
//!
//! Uses the offline hashing embedder, so no model files or network are needed.

use risk_profiler::{Config, Profiler, ProfilerError, SessionState};

async fn offline_profiler() -> Profiler {
    Profiler::from_config(&Config::offline())
        .await
        .expect("offline profiler should start")
}

#[tokio::test]
async fn test_full_questionnaire_resolves_majority_labels() {
    let profiler = offline_profiler().await;
    let mut session = profiler.start_session();

    let answers = [
        "bonds",
        "safe",
        "stable",
        "high risk",
        "beat the market",
        "trust my instincts",
        "beat the market",
        "diversified",
    ];
    for answer in answers {
        assert!(profiler.next_question(&session).is_some());
        let submission = profiler.submit_answer(&mut session, answer).await.unwrap();
        assert!(submission.accepted);
        assert!(submission.warning.is_none());
    }

    assert_eq!(session.state(), SessionState::Complete);
    assert!(profiler.next_question(&session).is_none());

    let results = profiler.results(&session).unwrap();
    assert_eq!(results.risk_label, "Conservative");
    assert_eq!(results.bias_label, "Overconfidence Bias");
    assert_eq!(results.transcript.len(), 8);
    assert_eq!(results.transcript[3].answer_text, "high risk");
    assert_eq!(
        results.transcript[0].question_text,
        profiler.questionnaire().get(0).unwrap().text
    );
}

#[tokio::test]
async fn test_results_unavailable_before_eighth_answer() {
    let profiler = offline_profiler().await;
    let mut session = profiler.start_session();

    for i in 0..7 {
        profiler
            .submit_answer(&mut session, "some answer")
            .await
            .unwrap();
        let err = profiler.results(&session).unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::SessionIncomplete { answered, total: 8 } if answered == i + 1
        ));
    }

    profiler
        .submit_answer(&mut session, "last answer")
        .await
        .unwrap();
    assert!(profiler.next_question(&session).is_none());
    assert!(profiler.results(&session).is_ok());
}

#[tokio::test]
async fn test_blank_answers_do_not_advance_or_tally() {
    let profiler = offline_profiler().await;
    let mut session = profiler.start_session();

    for blank in ["", "   ", "\n\t"] {
        let submission = profiler.submit_answer(&mut session, blank).await.unwrap();
        assert!(!submission.accepted);
        assert!(submission.warning.is_some());
        assert_eq!(session.state(), SessionState::AwaitingAnswer(0));
    }
    assert_eq!(session.responses().count(), 0);
}

#[tokio::test]
async fn test_misspelled_answer_still_matches() {
    let profiler = offline_profiler().await;
    let outcome = profiler
        .classifier()
        .classify(
            "diversifed",
            profiler.store().get(risk_profiler::TaxonomyId::Risk),
        )
        .await
        .unwrap();
    assert_eq!(outcome.as_deref(), Some("Moderate"));
}
