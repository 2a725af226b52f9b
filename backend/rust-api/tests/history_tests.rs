use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn listing_returns_own_attempts_newest_first() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");

    for _ in 0..2 {
        let started = common::start_attempt(&app, &token, "quiz-1").await;
        let attempt_id = started["attempt_id"].as_str().unwrap();
        common::request(
            &app,
            "POST",
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            &token,
            Some(json!({ "answers": [] })),
        )
        .await;
    }

    let (status, listing) = common::request(
        &app,
        "GET",
        "/api/v1/assessments/quiz-1/attempts",
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempts = listing.as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["attempt_number"], 2);
    assert_eq!(attempts[1]["attempt_number"], 1);
}

#[tokio::test]
async fn learners_cannot_list_someone_elses_history() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");

    let (status, _) = common::request(
        &app,
        "GET",
        "/api/v1/assessments/quiz-1/attempts?learner_id=learner-2",
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn graders_can_list_a_learners_history() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let student = common::student_token("learner-1");
    let teacher = common::teacher_token("teacher-1");

    common::start_attempt(&app, &student, "quiz-1").await;

    let (status, listing) = common::request(
        &app,
        "GET",
        "/api/v1/assessments/quiz-1/attempts?learner_id=learner-1",
        &teacher,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn detail_is_forbidden_for_strangers_but_open_to_graders() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let owner = common::student_token("learner-1");
    let stranger = common::student_token("learner-2");
    let teacher = common::teacher_token("teacher-1");

    let started = common::start_attempt(&app, &owner, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();
    let url = format!("/api/v1/attempts/{attempt_id}");

    let (status, _) = common::request(&app, "GET", &url, &stranger, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::request(&app, "GET", &url, &teacher, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn immediate_visibility_reveals_results_after_submit() {
    let app = common::create_test_app().await;
    common::seed_choice_quiz(&app, "quiz-1").await;
    let token = common::student_token("learner-1");
    let started = common::start_attempt(&app, &token, "quiz-1").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    common::request(
        &app,
        "POST",
        &format!("/api/v1/attempts/{attempt_id}/submit"),
        &token,
        Some(json!({ "answers": [{ "question_id": "q1", "option_id": "q1-a" }] })),
    )
    .await;

    let (_, detail) = common::request(
        &app,
        "GET",
        &format!("/api/v1/attempts/{attempt_id}"),
        &token,
        None,
    )
    .await;
    let q1 = detail["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["question_id"] == "q1")
        .unwrap();
    assert_eq!(q1["points_earned"], 5);
    assert_eq!(q1["is_correct"], true);
}

#[tokio::test]
async fn never_visibility_withholds_points_but_shows_selections() {
    let app = common::create_test_app().await;
    let mut definition = common::definition_json("quiz-sealed");
    definition["answer_visibility"] = json!("never");
    common::seed_definition(
        &app,
        definition,
        vec![
            common::choice_question_json("q1", "quiz-sealed", 5, 0),
            common::choice_question_json("q2", "quiz-sealed", 5, 1),
        ],
    )
    .await;
    let token = common::student_token("learner-1");
    let started = common::start_attempt(&app, &token, "quiz-sealed").await;
    let attempt_id = started["attempt_id"].as_str().unwrap();

    common::request(
        &app,
        "POST",
        &format!("/api/v1/attempts/{attempt_id}/submit"),
        &token,
        Some(json!({ "answers": [{ "question_id": "q1", "option_id": "q1-a" }] })),
    )
    .await;

    let url = format!("/api/v1/attempts/{attempt_id}");
    let (_, detail) = common::request(&app, "GET", &url, &token, None).await;
    let q1 = detail["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["question_id"] == "q1")
        .unwrap();
    assert_eq!(q1["option_id"], "q1-a");
    assert!(q1["points_earned"].is_null());
    assert!(q1["is_correct"].is_null());
    // The aggregate on the summary stays visible either way.
    assert_eq!(detail["score"], 5);

    // Graders are exempt from the policy.
    let teacher = common::teacher_token("teacher-1");
    let (_, grader_view) = common::request(&app, "GET", &url, &teacher, None).await;
    let q1 = grader_view["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["question_id"] == "q1")
        .unwrap();
    assert_eq!(q1["points_earned"], 5);
}

#[tokio::test]
async fn after_deadline_visibility_waits_for_the_due_date() {
    let app = common::create_test_app().await;

    let past_due = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
    let future_due = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();

    for (definition_id, due, expect_visible) in [
        ("quiz-open", past_due.as_str(), true),
        ("quiz-pending", future_due.as_str(), false),
    ] {
        let mut definition = common::definition_json(definition_id);
        definition["answer_visibility"] = json!("after_deadline");
        definition["due_at"] = json!(due);
        common::seed_definition(
            &app,
            definition,
            vec![
                common::choice_question_json("q1", definition_id, 5, 0),
                common::choice_question_json("q2", definition_id, 5, 1),
            ],
        )
        .await;

        let token = common::student_token("learner-1");
        let started = common::start_attempt(&app, &token, definition_id).await;
        let attempt_id = started["attempt_id"].as_str().unwrap();
        common::request(
            &app,
            "POST",
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            &token,
            Some(json!({ "answers": [{ "question_id": "q1", "option_id": "q1-a" }] })),
        )
        .await;

        let (_, detail) = common::request(
            &app,
            "GET",
            &format!("/api/v1/attempts/{attempt_id}"),
            &token,
            None,
        )
        .await;
        let q1 = detail["answers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["question_id"] == "q1")
            .unwrap();
        assert_eq!(
            q1["points_earned"].is_null(),
            !expect_visible,
            "{definition_id}"
        );
    }
}
