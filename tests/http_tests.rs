mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::Harness;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wake_command::http::{record_command, COMMAND_HISTORY_LIMIT};
use wake_command::{create_router, AppState};

fn router(h: &Harness) -> (Router, Arc<RwLock<VecDeque<wake_command::http::CommandRecord>>>) {
    let commands = Arc::new(RwLock::new(VecDeque::new()));
    let app = create_router(AppState::new(h.session.clone(), Arc::clone(&commands)));
    (app, commands)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let h = Harness::new("hey test");
    let (app, _) = router(&h);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_start_and_stop() {
    let h = Harness::new("hey test");
    let (app, _) = router(&h);

    let (status, body) = send(app.clone(), "POST", "/session/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["lifecycle"], "listening");
    assert_eq!(body["status"]["wake_word"], "hey test");

    let (status, body) = send(app, "POST", "/session/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["lifecycle"], "idle");
}

#[tokio::test]
async fn test_start_unsupported() {
    let h = Harness::unsupported("hey test");
    let (app, _) = router(&h);

    let (status, body) = send(app, "POST", "/session/start", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not supported"));
}

#[tokio::test]
async fn test_set_wake_word() {
    let h = Harness::started("hey test").await;
    let (app, _) = router(&h);

    let (status, body) = send(
        app.clone(),
        "PUT",
        "/session/wake-word",
        Some(r#"{"wake_word": "OK Computer"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["wake_word"], "ok computer");

    let (status, _) = send(app, "PUT", "/session/wake-word", Some(r#"{"wake_word": "  "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_language_and_log_level() {
    let h = Harness::new("hey test");
    let (app, _) = router(&h);

    let (status, body) =
        send(app.clone(), "PUT", "/session/language", Some(r#"{"language": "de-DE"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["language"], "de-DE");

    let (status, _) = send(app.clone(), "PUT", "/session/language", Some(r#"{"language": ""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send(app.clone(), "PUT", "/session/log-level", Some(r#"{"level": "debug"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["log_level"], "debug");

    let (status, body) = send(app, "PUT", "/session/log-level", Some(r#"{"level": "chatty"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("chatty"));
}

#[tokio::test]
async fn test_status_reports_stats() {
    let h = Harness::started("hey test").await;
    h.say("hey test turn on the lights", true).await;
    let (app, _) = router(&h);

    let (status, body) = send(app, "GET", "/session/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capture"], "awaiting_wake_word");
    assert_eq!(body["stats"]["commands"], 1);
    assert_eq!(body["stats"]["wake_words"], 1);
}

#[tokio::test]
async fn test_command_history() {
    let h = Harness::new("hey test");
    let (app, commands) = router(&h);

    for i in 0..COMMAND_HISTORY_LIMIT + 5 {
        record_command(&commands, &format!("command {}", i)).await;
    }

    let (status, body) = send(app, "GET", "/session/commands", None).await;
    assert_eq!(status, StatusCode::OK);

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), COMMAND_HISTORY_LIMIT);
    assert_eq!(records[0]["text"], "command 5");
    assert_eq!(
        records[COMMAND_HISTORY_LIMIT - 1]["text"],
        format!("command {}", COMMAND_HISTORY_LIMIT + 4)
    );
}
