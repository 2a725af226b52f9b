use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn draft_answers_are_saved_and_overwritten() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");

    let started = common::start_attempt(&app, &token, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    let (status, saved) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q1"),
        &token,
        Some(json!({ "option_id": "q1-b" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["option_id"], "q1-b");

    // Last write wins for the same question.
    let (status, resaved) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q1"),
        &token,
        Some(json!({ "option_id": "q1-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resaved["option_id"], "q1-a");
    assert_eq!(resaved["_id"], saved["_id"]);

    let (status, detail) = common::request(
        &app,
        "GET",
        &format!("/api/v1/attempts/{attempt_id}"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let answers = detail["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0]["option_id"], "q1-a");
    // Drafts carry no grading data.
    assert!(answers[0]["points_earned"].is_null());
    assert!(answers[0]["is_correct"].is_null());
}

#[tokio::test]
async fn unknown_option_is_rejected() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");
    let started = common::start_attempt(&app, &token, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    let (status, body) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q1"),
        &token,
        Some(json!({ "option_id": "q2-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidOption");
}

#[tokio::test]
async fn saving_on_another_learners_attempt_is_forbidden() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let owner = common::student_token("learner-1");
    let intruder = common::student_token("learner-2");

    let started = common::start_attempt(&app, &owner, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    let (status, _) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q1"),
        &intruder,
        Some(json!({ "option_id": "q1-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn saving_after_submit_is_rejected() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");
    let started = common::start_attempt(&app, &token, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    let (status, _) = common::request(
        &app,
        "POST",
        &format!("/api/v1/attempts/{attempt_id}/submit"),
        &token,
        Some(json!({ "answers": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q1"),
        &token,
        Some(json!({ "option_id": "q1-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AttemptNotEditable");
}

#[tokio::test]
async fn essay_drafts_store_free_text() {
    let app = common::create_test_app().await;
    common::seed_mixed_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");
    let started = common::start_attempt(&app, &token, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    let (status, saved) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q2"),
        &token,
        Some(json!({ "free_text": "Because entropy only increases." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["free_text"], "Because entropy only increases.");

    // An option selection on an essay question makes no sense.
    let (status, _) = common::request(
        &app,
        "PUT",
        &format!("/api/v1/attempts/{attempt_id}/answers/q2"),
        &token,
        Some(json!({ "option_id": "q1-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
