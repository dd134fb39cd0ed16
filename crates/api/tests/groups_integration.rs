//! Group lifecycle over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ALICE, BOB, CAROL};
use domain::models::TradeStatus;
use domain::store::TradeStore;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_create_group_makes_caller_admin() {
    let app = TestApp::new();
    let alice_id = app.register(ALICE).await;

    let (status, json) = app
        .call(
            ALICE,
            Method::POST,
            "/api/groups",
            Some(json!({ "group_name": "Night shift" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "Night shift");
    assert_eq!(json["owner_id"], alice_id);
    assert_eq!(json["your_role"], "ADMIN");
    assert_eq!(json["invitation_code"].as_str().unwrap().len(), 6);
}

#[tokio::test]
async fn test_join_with_code_and_list() {
    let app = TestApp::new();
    app.register(ALICE).await;
    app.register(BOB).await;
    let (group_id, code) = app.create_group(ALICE, "Cafe").await;

    let (status, json) = app
        .call(
            BOB,
            Method::POST,
            "/api/groups/join",
            Some(json!({ "invitation_code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["group"]["id"], group_id);
    assert_eq!(json["member"]["role"], "MEMBER");

    let (status, json) = app.call(BOB, Method::GET, "/api/groups", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["data"][0]["id"], group_id);
}

#[tokio::test]
async fn test_join_twice_conflicts() {
    let app = TestApp::new();
    app.register(ALICE).await;
    app.register(BOB).await;
    let (_, code) = app.create_group(ALICE, "Cafe").await;

    assert_eq!(app.join(BOB, &code).await, StatusCode::OK);
    assert_eq!(app.join(BOB, &code).await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_unknown_code_is_not_found() {
    let app = TestApp::new();
    app.register(BOB).await;
    assert_eq!(app.join(BOB, "ZZZZZZ").await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_is_owner_only() {
    let app = TestApp::new();
    app.register(ALICE).await;
    app.register(BOB).await;
    let (group_id, code) = app.create_group(ALICE, "Cafe").await;
    app.join(BOB, &code).await;

    let uri = format!("/api/groups/{}", group_id);
    let (status, _) = app
        .call(BOB, Method::PUT, &uri, Some(json!({ "name": "Hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .call(ALICE, Method::PUT, &uri, Some(json!({ "name": "Bistro" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Bistro");
}

#[tokio::test]
async fn test_dissolve_closes_trades_and_hides_group() {
    let app = TestApp::new();
    app.register(ALICE).await;
    app.register(BOB).await;
    app.register(CAROL).await;
    let (group_id, code) = app.create_group(ALICE, "Cafe").await;
    app.join(BOB, &code).await;
    app.join(CAROL, &code).await;
    let first = app.create_trade(BOB, &group_id, 24).await;
    let second = app.create_trade(CAROL, &group_id, 48).await;

    let uri = format!("/api/groups/{}", group_id);
    let (status, _) = app.call(BOB, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.call(ALICE, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["closed_trades"], 2);

    for id in [first, second] {
        let trade = app
            .store
            .find_trade(id.parse::<Uuid>().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trade.status, TradeStatus::Closed);
    }

    let (_, json) = app.call(BOB, Method::GET, "/api/groups", None).await;
    assert_eq!(json["count"], 0);
    assert_eq!(app.join(CAROL, &code).await, StatusCode::NOT_FOUND);

    let dissolved = app
        .store
        .find_group_including_dissolved(group_id.parse().unwrap())
        .await
        .unwrap();
    assert!(dissolved.is_dissolved());
}

#[tokio::test]
async fn test_failed_dissolve_changes_nothing() {
    let app = TestApp::new();
    app.register(ALICE).await;
    app.register(BOB).await;
    let (group_id, code) = app.create_group(ALICE, "Cafe").await;
    app.join(BOB, &code).await;
    let trade_id = app.create_trade(BOB, &group_id, 24).await;

    app.store
        .inject_failure(domain::store::FailPoint::MidTransaction);
    let (status, json) = app
        .call(ALICE, Method::DELETE, &format!("/api/groups/{}", group_id), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal_error");
    app.store.clear_failure();

    let trade = app
        .store
        .find_trade(trade_id.parse::<Uuid>().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trade.status, TradeStatus::Open);
    let (_, json) = app.call(BOB, Method::GET, "/api/groups", None).await;
    assert_eq!(json["count"], 1);
}
