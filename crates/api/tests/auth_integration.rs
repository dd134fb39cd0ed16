//! Authentication and health endpoint tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{request, TestApp, ALICE, DEV_TOKEN};
use serde_json::json;

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let app = TestApp::new();
    let (status, json) = app
        .send(request(Method::GET, "/api/groups", None, None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, json) = app
        .send(request(Method::GET, "/api/groups", Some("forged"), None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid id_token");
}

#[tokio::test]
async fn test_verified_but_unregistered_is_not_registered() {
    let app = TestApp::new();
    let (status, json) = app.call(ALICE, Method::POST, "/api/me", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_registered");
}

#[tokio::test]
async fn test_dev_bypass_requires_subject_header() {
    let app = TestApp::new();
    let (status, json) = app
        .send(request(Method::POST, "/api/me", Some(DEV_TOKEN), None, None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_dev_bypass_registers_and_resolves_subject() {
    let app = TestApp::new();
    let (status, created) = app
        .send(request(
            Method::POST,
            "/api/users",
            Some(DEV_TOKEN),
            Some("dev-tester"),
            Some(json!({ "name": "Tester" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["external_id"], "dev-tester");

    let (status, me) = app
        .send(request(
            Method::POST,
            "/api/me",
            Some(DEV_TOKEN),
            Some("dev-tester"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user_id"], created["id"]);
}

#[tokio::test]
async fn test_dev_token_rejected_in_production() {
    let mut config = common::test_config();
    config.auth.environment = "production".to_string();
    let app = TestApp::with_config(config);

    let (status, _) = app
        .send(request(
            Method::POST,
            "/api/me",
            Some(DEV_TOKEN),
            Some("dev-tester"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let (status, json) = app
        .send(request(Method::GET, "/api/health", None, None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    let (status, json) = app
        .send(request(Method::GET, "/api/health/live", None, None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "alive");
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let app = TestApp::new();
    app.store
        .inject_failure(domain::store::FailPoint::Unavailable);
    let (status, json) = app
        .send(request(Method::GET, "/api/health", None, None, None))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["store"]["connected"], false);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        request(Method::GET, "/api/health/live", None, None, None),
    )
    .await
    .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
