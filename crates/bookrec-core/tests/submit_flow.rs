mod common;

use std::time::Duration;

use axum::http::StatusCode;
use bookrec_core::orchestrator::SubmitError;
use bookrec_core::protocol::{BroadcastMessage, Submission};
use bookrec_core::selection::Field;
use common::mock_gemini::{
    closed_base_url, drain, fill_selection, orchestrator_for, MockGemini, Reply, TEST_KEY,
};
use serde_json::json;

fn submissions(msgs: &[BroadcastMessage]) -> Vec<Submission> {
    msgs.iter()
        .filter_map(|m| match m {
            BroadcastMessage::Submission(s) => Some(s.clone()),
            BroadcastMessage::StateUpdated => None,
        })
        .collect()
}

#[tokio::test]
async fn successful_submit_prepends_history_and_clears_loading() {
    let mock = MockGemini::start(vec![Reply::text("Book A, Book B...")]).await;
    let (orch, mut rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Fantasy", "Adventurous", "Beginner").await;

    let text = orch.submit().await.unwrap();
    assert_eq!(text, "Book A, Book B...");

    let session = orch.state_manager().snapshot().await;
    assert!(!session.loading());
    assert_eq!(
        session.history().texts().collect::<Vec<_>>(),
        ["Book A, Book B..."]
    );

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].model_path, "gemini-pro:generateContent");
    assert_eq!(seen[0].key.as_deref(), Some(TEST_KEY));
    assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        seen[0].body,
        json!({ "contents": [ { "parts": [ { "text":
            "Recommend 6 books for a Beginner Fantasy reader feeling Adventurous. Explain why."
        } ] } ] })
    );

    let subs = submissions(&drain(&mut rx));
    assert_eq!(
        subs,
        vec![
            Submission::Started { id: 1 },
            Submission::Succeeded { id: 1, entries: 1 }
        ]
    );
}

#[tokio::test]
async fn reply_without_candidates_is_semantic_failure() {
    let mock = MockGemini::start(vec![Reply::Json(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    )])
    .await;
    let (orch, mut rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Horror", "Creepy", "Expert").await;

    assert_eq!(orch.submit().await.unwrap_err(), SubmitError::Semantic);

    let session = orch.state_manager().snapshot().await;
    assert!(!session.loading());
    assert!(session.history().is_empty());
    assert!(session.selection().is_complete());
    assert!(matches!(
        submissions(&drain(&mut rx)).last(),
        Some(Submission::Failed {
            error: SubmitError::Semantic,
            ..
        })
    ));
}

#[tokio::test]
async fn empty_text_is_semantic_failure() {
    let mock = MockGemini::start(vec![Reply::text("")]).await;
    let (orch, _rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Poetry", "Joyful", "Beginner").await;

    assert_eq!(orch.submit().await.unwrap_err(), SubmitError::Semantic);
    assert!(orch.state_manager().snapshot().await.history().is_empty());
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    let mut config = bookrec_core::config::ApiConfig::default();
    config.base_url = closed_base_url().await;
    let (orch, mut rx) = orchestrator_for(&config);
    fill_selection(&orch, "Fantasy", "Adventurous", "Beginner").await;

    let err = orch.submit().await.unwrap_err();
    assert_eq!(err.kind(), "transport");
    if let SubmitError::Transport { message } = &err {
        assert!(!message.contains(TEST_KEY), "credential leaked: {message}");
    }

    let session = orch.state_manager().snapshot().await;
    assert!(!session.loading());
    assert!(session.history().is_empty());
    assert!(matches!(
        submissions(&drain(&mut rx)).last(),
        Some(Submission::Failed { .. })
    ));
}

#[tokio::test]
async fn error_status_is_transport_failure_even_with_json_body() {
    let mock = MockGemini::start(vec![Reply::Json(
        StatusCode::FORBIDDEN,
        json!({ "error": { "code": 403, "message": "API key not valid" } }),
    )])
    .await;
    let (orch, _rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Fantasy", "Adventurous", "Beginner").await;

    let err = orch.submit().await.unwrap_err();
    match err {
        SubmitError::Transport { message } => assert!(message.contains("403")),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert!(!orch.state_manager().loading().await);
}

#[tokio::test]
async fn malformed_body_is_transport_failure() {
    let mock = MockGemini::start(vec![Reply::Raw(StatusCode::OK, "<html>oops".into())]).await;
    let (orch, _rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Fantasy", "Adventurous", "Beginner").await;

    assert_eq!(orch.submit().await.unwrap_err().kind(), "transport");
    let session = orch.state_manager().snapshot().await;
    assert!(!session.loading());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn incomplete_selection_never_reaches_the_network() {
    let mock = MockGemini::start(vec![Reply::text("unused")]).await;
    let (orch, mut rx) = orchestrator_for(&mock.api_config());
    let sm = orch.state_manager();
    sm.select(Field::Genre, Some("Fantasy".into())).await;
    sm.select(Field::Level, Some("Beginner".into())).await;

    let err = orch.submit().await.unwrap_err();
    assert_eq!(
        err,
        SubmitError::Incomplete {
            missing: vec![Field::Mood]
        }
    );
    assert_eq!(mock.hits(), 0);
    let session = sm.snapshot().await;
    assert!(!session.loading());
    assert!(session.history().is_empty());
    assert_eq!(
        submissions(&drain(&mut rx)),
        vec![Submission::Rejected { error: err }]
    );
}

#[tokio::test]
async fn n_submissions_accumulate_newest_first() {
    let mock = MockGemini::start(vec![
        Reply::text("first"),
        Reply::text("second"),
        Reply::text("third"),
    ])
    .await;
    let (orch, _rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Mystery", "Cozy", "Intermediate").await;

    for _ in 0..3 {
        orch.submit().await.unwrap();
    }
    let session = orch.state_manager().snapshot().await;
    assert_eq!(session.history().len(), 3);
    assert_eq!(
        session.history().texts().collect::<Vec<_>>(),
        ["third", "second", "first"]
    );
    assert_eq!(session.history().label(0), "Recommendation List 3");
    assert_eq!(mock.hits(), 3);
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let mock = MockGemini::start_gated(vec![Reply::text("only one")]).await;
    let (orch, _rx) = orchestrator_for(&mock.api_config());
    fill_selection(&orch, "Fantasy", "Epic", "Expert").await;

    let first = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.submit().await })
    };

    // Wait until the first request is parked at the mock.
    let sm = orch.state_manager();
    for _ in 0..200 {
        if mock.hits() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(mock.hits(), 1);
    assert!(sm.loading().await);

    assert_eq!(orch.submit().await.unwrap_err(), SubmitError::InFlight);
    assert!(sm.loading().await);

    mock.release();
    assert_eq!(first.await.unwrap().unwrap(), "only one");
    assert!(!sm.loading().await);
    assert_eq!(mock.hits(), 1);
    assert_eq!(sm.snapshot().await.history().len(), 1);
}
