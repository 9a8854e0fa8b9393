use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use uuid::Uuid;

mod support;

use support::{get_request, test_app};

fn response_id(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("x-request-id header")
        .to_string()
}

#[tokio::test]
async fn supplied_request_id_is_echoed_back() {
    let (_pool, _config, app) = test_app().await;

    let request = Request::builder()
        .uri("/auth/check")
        .header("x-request-id", "corr-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Even a rejected request carries the correlation id back.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_id(&response), "corr-abc-123");
}

#[tokio::test]
async fn missing_request_id_gets_a_generated_uuid() {
    let (_pool, _config, app) = test_app().await;

    let response = app.oneshot(get_request("/auth/check")).await.unwrap();
    let id = response_id(&response);
    assert!(Uuid::parse_str(&id).is_ok());
}

#[tokio::test]
async fn oversized_request_id_is_replaced() {
    let (_pool, _config, app) = test_app().await;

    let huge = "z".repeat(500);
    let request = Request::builder()
        .uri("/auth/check")
        .header("x-request-id", &huge)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let id = response_id(&response);
    assert_ne!(id, huge);
    assert!(Uuid::parse_str(&id).is_ok());
}
