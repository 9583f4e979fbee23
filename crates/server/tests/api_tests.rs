use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use pylearn_core::time::fixed_clock;
use pylearn_server::{routes, seed, state::AppState};
use serde_json::{Value, json};
use services::AppServices;
use storage::repository::Storage;
use tower::ServiceExt;

/// Router over a seeded in-memory backend. Seeded ids: admin user 1,
/// lesson 1 holds question 1 ("print", 10 pts) and MCQ 1 (correct C, 10 pts),
/// lesson 2 holds question 2 ("if", 15 pts) and MCQ 2.
async fn app() -> Router {
    let storage = Storage::in_memory();
    seed::run(&storage, &seed::SeedOptions::default())
        .await
        .expect("seed");
    let services = AppServices::new(storage, fixed_clock(), Duration::hours(24));
    routes::create_router(AppState::new(services))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn learner(app: &Router) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Ana", "email": "ana@example.com", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, "ana@example.com", "secret").await
}

async fn admin(app: &Router) -> String {
    login(app, seed::DEFAULT_ADMIN_EMAIL, seed::DEFAULT_ADMIN_PASSWORD).await
}

async fn lesson(app: &Router, token: &str, id: u64) -> Value {
    let (status, body) = send(app, "GET", &format!("/lessons/{id}"), Some(token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn answering_requires_a_session() {
    let app = app().await;
    let payload = json!({ "question_id": 1, "answer": "print" });

    let (status, body) = send(&app, "POST", "/check_answer", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, "POST", "/check_answer", Some("bogus"), Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn short_answer_then_mcq_completes_the_lesson() {
    let app = app().await;
    let token = learner(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/check_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "answer": "  PRINT " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "correct");
    let detail = lesson(&app, &token, 1).await;
    assert_eq!(detail["score"], 10);
    assert_eq!(detail["completed"], false);
    assert_eq!(detail["max_score"], 20);
    assert_eq!(detail["questions"][0]["answered"], true);

    let (status, body) = send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "user_choice": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "wrong");
    assert_eq!(body["user_choice"], "A");
    assert_eq!(body["correct_option"], "C");
    let detail = lesson(&app, &token, 1).await;
    assert_eq!(detail["score"], 10);
    assert_eq!(detail["mcqs"][0]["selected"], "A");
    assert_eq!(detail["mcqs"][0]["is_correct"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "question_id": "1", "user_choice": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "correct");
    assert!(body.get("correct_option").is_none());
    let detail = lesson(&app, &token, 1).await;
    assert_eq!(detail["score"], 20);
    assert_eq!(detail["completed"], true);

    let (_, modules) = send(&app, "GET", "/modules", Some(&token), None).await;
    assert_eq!(modules[0]["completed_lessons"], 1);
    assert_eq!(modules[0]["total_score"], 20);
    assert_eq!(modules[0]["max_score"], 45);
}

#[tokio::test]
async fn wrong_short_answer_writes_nothing() {
    let app = app().await;
    let token = learner(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/check_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "answer": "echo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "wrong");

    let (_, profile) = send(&app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(profile["lessons"], json!([]));
    assert_eq!(profile["total_score"], 0);
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let app = app().await;
    let token = learner(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "user_choice": "E" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid answer choice.");

    let (status, body) = send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "question_id": 999, "user_choice": "e" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid answer choice.");

    let (status, body) = send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "user_choice": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid question id.");

    let (status, body) = send(
        &app,
        "POST",
        "/check_answer",
        Some(&token),
        Some(json!({ "answer": "print" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid question id.");

    let (status, body) = send(
        &app,
        "POST",
        "/check_answer",
        Some(&token),
        Some(json!({ "question_id": 999, "answer": "print" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (_, profile) = send(&app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(profile["lessons"], json!([]));
}

#[tokio::test]
async fn learners_cannot_reach_admin_routes() {
    let app = app().await;
    let token = learner(&app).await;

    let (status, body) = send(&app, "GET", "/admin/modules", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "error");

    let (status, _) = send(
        &app,
        "POST",
        "/admin/modules",
        Some(&token),
        Some(json!({ "title": "Sneaky" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn new_question_reopens_a_completed_lesson() {
    let app = app().await;
    let token = learner(&app).await;
    let admin = admin(&app).await;

    send(
        &app,
        "POST",
        "/check_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "answer": "print" })),
    )
    .await;
    send(
        &app,
        "POST",
        "/submit_mcq_answer",
        Some(&token),
        Some(json!({ "question_id": 1, "user_choice": "C" })),
    )
    .await;
    assert_eq!(lesson(&app, &token, 1).await["completed"], true);

    let (status, created) = send(
        &app,
        "POST",
        "/admin/questions",
        Some(&admin),
        Some(json!({ "lesson_id": 1, "prompt": "Loop keyword?", "answer": "for", "points": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let detail = lesson(&app, &token, 1).await;
    assert_eq!(detail["completed"], false);
    assert_eq!(detail["score"], 20);
    assert_eq!(detail["max_score"], 25);

    let id = created["id"].as_u64().unwrap();
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/admin/questions/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(lesson(&app, &token, 1).await["completed"], true);
}

#[tokio::test]
async fn admin_user_table_and_account_rules() {
    let app = app().await;
    let _ = learner(&app).await;
    let admin = admin(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Copy", "email": "ANA@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, users) = send(&app, "GET", "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert_eq!(users[1]["total_lessons"], 2);
    assert_eq!(users[1]["percent"], 0.0);
    assert!(users[1]["user"].get("password_hash").is_none());

    let (status, body) = send(&app, "DELETE", "/admin/users/1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, "DELETE", "/admin/users/2", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "POST", "/auth/login", None, Some(json!({
        "email": "ana@example.com",
        "password": "secret",
    })))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app().await;
    let token = learner(&app).await;

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contact_messages_reach_the_admin_inbox() {
    let app = app().await;
    let admin = admin(&app).await;

    let (status, stored) = send(
        &app,
        "POST",
        "/contact",
        None,
        Some(json!({ "name": "Budi", "email": "budi@example.com", "message": "Hello!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["is_read"], false);

    let (status, inbox) = send(&app, "GET", "/admin/messages", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unread"], 1);
    assert_eq!(inbox["messages"][0]["message"], "Hello!");

    let id = stored["id"].as_u64().unwrap();
    let (_, toggled) = send(
        &app,
        "POST",
        &format!("/admin/messages/{id}/toggle_read"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(toggled["is_read"], true);

    let (status, body) = send(
        &app,
        "POST",
        "/contact",
        None,
        Some(json!({ "name": "", "email": "budi@example.com", "message": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}
