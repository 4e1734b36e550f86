//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use storyloom_core::services::{CompletionService, EmbeddingService};
use storyloom_narrative::application::session::{Session, SessionPorts, SessionSettings};
use storyloom_narrative::application::timer::RoundTimer;
use storyloom_store::MemorySessionStore;
use storyloom_test_support::{FixedClock, RecordingSender, ScriptedCompletion, TableEmbeddings};
use tower::ServiceExt;

use storyloom_api::app;
use storyloom_api::state::AppState;

/// Scenario used by every seeded test app.
pub const SCENARIO: &str = "You are a group of friends trapped in a lighthouse.";
/// Opening narration the scripted model returns for [`SCENARIO`].
pub const OPENING: &str = "The lamp above you flickers.";

/// Everything a test needs to drive and inspect the app.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemorySessionStore>,
    pub session: Arc<Session>,
    pub sender: Arc<RecordingSender>,
}

/// Build the app over an in-memory store with the given model doubles.
/// The session is not initialized.
pub fn build_unseeded_app(
    completion: Arc<dyn CompletionService>,
    embeddings: Arc<dyn EmbeddingService>,
) -> TestApp {
    let store = Arc::new(MemorySessionStore::new());
    let sender = Arc::new(RecordingSender::new());
    let ports = SessionPorts {
        history: store.clone(),
        participants: store.clone(),
        proposals: store.clone(),
        completion,
        embeddings,
        sender: sender.clone(),
        clock: Arc::new(FixedClock::standard()),
    };
    let session = Arc::new(Session::new(ports, SessionSettings::default()));
    let timer = Arc::new(RoundTimer::new(session.clone(), Duration::from_secs(600)));
    let router = app(AppState::new(session.clone(), timer));

    TestApp {
        router,
        store,
        session,
        sender,
    }
}

/// Build a seeded app whose model answers with `narrations` after the opening.
pub async fn build_test_app(narrations: &[&str]) -> TestApp {
    let mut replies = vec![OPENING.to_owned()];
    replies.extend(narrations.iter().map(|n| (*n).to_owned()));
    let app = build_unseeded_app(
        Arc::new(ScriptedCompletion::new(replies)),
        Arc::new(TableEmbeddings::default()),
    );
    app.session.initialize(SCENARIO).await.unwrap();
    app
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, body_bytes.to_vec())
}

/// Send a form-encoded POST, as Twilio does, and return status, content
/// type and body text.
pub async fn post_form(app: Router, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String, String) {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let (status, content_type, bytes) = send(app, request).await;
    (status, content_type, String::from_utf8(bytes).unwrap())
}

/// Send a POST request without a body and return the JSON response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let (status, _, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Send a GET request and return the JSON response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let (status, _, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Percent-encodes a form value.
fn encode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(char::from(byte));
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
