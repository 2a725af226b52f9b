#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use assessment_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    services::{AppState, RoleGradeAuthorizer},
    store::MemoryStore,
};

/// In-memory app for integration tests: same router and middleware as
/// production, MemoryStore instead of MongoDB.
pub async fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config::for_tests();
    let app_state = Arc::new(AppState::with_store(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(RoleGradeAuthorizer),
    ));

    create_router(app_state)
}

pub fn token_for(sub: &str, role: &str) -> String {
    let service = JwtService::new(&Config::for_tests().jwt_secret);
    let now = chrono::Utc::now().timestamp();
    service
        .generate_token(JwtClaims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (now + 3600) as usize,
            iat: now as usize,
        })
        .expect("token generation failed")
}

pub fn student_token(sub: &str) -> String {
    token_for(sub, "student")
}

pub fn teacher_token(sub: &str) -> String {
    token_for(sub, "teacher")
}

pub fn admin_token() -> String {
    token_for("admin-1", "admin")
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Seeds a definition through the admin import endpoint.
pub async fn seed_definition(app: &Router, definition: Value, questions: Vec<Value>) {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/admin/definitions",
        &admin_token(),
        Some(json!({ "definition": definition, "questions": questions })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "seed failed: {body}");
}

pub fn definition_json(id: &str) -> Value {
    json!({
        "_id": id,
        "context_ref": "course-1",
        "title": "Sample Quiz",
        "max_score": 10,
        "time_limit_seconds": null,
        "max_attempts": 2,
        "passing_score": 5,
        "shuffle_questions": false,
        "shuffle_options": false,
        "answer_visibility": "immediate",
        "due_at": null,
        "is_published": true,
        "is_active": true
    })
}

pub fn choice_question_json(id: &str, definition_id: &str, points: i64, order: i64) -> Value {
    json!({
        "_id": id,
        "definition_id": definition_id,
        "question_type": "single_choice",
        "prompt": format!("Question {id}"),
        "default_points": points,
        "order_index": order,
        "is_active": true,
        "options": [
            { "id": format!("{id}-a"), "label": "Right", "is_correct": true, "points_value": null },
            { "id": format!("{id}-b"), "label": "Wrong", "is_correct": false, "points_value": null }
        ]
    })
}

pub fn essay_question_json(id: &str, definition_id: &str, points: i64, order: i64) -> Value {
    json!({
        "_id": id,
        "definition_id": definition_id,
        "question_type": "essay",
        "prompt": format!("Essay {id}"),
        "default_points": points,
        "order_index": order,
        "is_active": true,
        "options": []
    })
}

/// Standard fixture: two 5-point choice questions, 10 max, pass at 5.
pub async fn seed_choice_quiz(app: &Router, definition_id: &str) {
    seed_definition(
        app,
        definition_json(definition_id),
        vec![
            choice_question_json("q1", definition_id, 5, 0),
            choice_question_json("q2", definition_id, 5, 1),
        ],
    )
    .await;
}

/// Mixed fixture: one 5-point choice question plus one 5-point essay.
pub async fn seed_mixed_quiz(app: &Router, definition_id: &str) {
    seed_definition(
        app,
        definition_json(definition_id),
        vec![
            choice_question_json("q1", definition_id, 5, 0),
            essay_question_json("q2", definition_id, 5, 1),
        ],
    )
    .await;
}

pub async fn start_attempt(app: &Router, token: &str, definition_id: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        &format!("/api/v1/assessments/{definition_id}/attempts"),
        token,
        None,
    )
    .await;
    assert!(
        status == StatusCode::CREATED || status == StatusCode::OK,
        "start failed: {status} {body}"
    );
    body
}
