//! Integration tests for the health endpoint.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use storyloom_test_support::{FailingCompletion, TableEmbeddings};

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app(&[]).await;

    let (status, json) = common::get_json(app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["seeded"], true);
    assert_eq!(json["game_running"], false);
}

#[tokio::test]
async fn test_health_reports_unseeded_session() {
    let app = common::build_unseeded_app(
        Arc::new(FailingCompletion),
        Arc::new(TableEmbeddings::default()),
    );

    let (status, json) = common::get_json(app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["seeded"], false);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(&[]).await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
