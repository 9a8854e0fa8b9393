use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod support;

use support::{get_request, response_cookie, test_app};

fn location(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("Location header")
        .to_string()
}

#[tokio::test]
async fn google_login_redirects_to_consent_with_a_state_cookie() {
    let (_pool, config, app) = test_app().await;

    let response = app.oneshot(get_request("/auth/google")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let url = location(&response);
    assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
    assert!(url.contains(&format!("client_id={}", config.google_client_id)));
    assert!(url.contains("response_type=code"));
    assert!(!url.contains(&config.google_client_secret));

    // The state parameter in the URL matches the nonce cookie.
    let state_cookie = response_cookie(&response, "oauth_state").expect("state cookie");
    assert!(url.contains(&format!("state={}", state_cookie)));
}

#[tokio::test]
async fn callback_without_a_state_cookie_bounces_to_login() {
    let (_pool, config, app) = test_app().await;

    let response = app
        .oneshot(get_request("/auth/google/callback?code=abc&state=xyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), config.login_redirect);
}

#[tokio::test]
async fn callback_with_mismatched_state_bounces_to_login() {
    let (_pool, config, app) = test_app().await;

    let request = Request::builder()
        .uri("/auth/google/callback?code=abc&state=attacker-chosen")
        .header(header::COOKIE, "oauth_state=the-real-nonce")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), config.login_redirect);
}

#[tokio::test]
async fn callback_with_provider_error_bounces_to_login() {
    let (_pool, config, app) = test_app().await;

    let response = app
        .oneshot(get_request("/auth/google/callback?error=access_denied"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), config.login_redirect);
}

#[tokio::test]
async fn callback_without_a_code_bounces_to_login() {
    let (_pool, config, app) = test_app().await;

    let request = Request::builder()
        .uri("/auth/google/callback?state=the-nonce")
        .header(header::COOKIE, "oauth_state=the-nonce")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), config.login_redirect);
}
