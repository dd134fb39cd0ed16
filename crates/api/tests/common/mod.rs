//! Shared fixtures for the router integration tests.
//!
//! Every test gets its own in-memory store, a recording push gateway and a
//! verifier that knows a fixed set of identities. No database is needed.

// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use domain::services::{MockIdentityVerifier, MockPushGateway};
use domain::store::MemoryTradeStore;
use shift_trade_api::app::{create_app, AppState};
use shift_trade_api::config::{
    AuthConfig, Config, DatabaseConfig, LineConfig, LoggingConfig, NotificationsConfig,
    RemindersConfig, ServerConfig,
};

pub const DEV_TOKEN: &str = "integration-dev-token";

/// An identity the mock verifier accepts.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub token: &'static str,
    pub line_id: &'static str,
    pub name: &'static str,
}

pub const ALICE: Identity = Identity {
    token: "alice-id-token",
    line_id: "U0000000000000000000000000000a11c",
    name: "Alice",
};
pub const BOB: Identity = Identity {
    token: "bob-id-token",
    line_id: "U00000000000000000000000000000b0b",
    name: "Bob",
};
pub const CAROL: Identity = Identity {
    token: "carol-id-token",
    line_id: "U000000000000000000000000000ca201",
    name: "Carol",
};
pub const DAVE: Identity = Identity {
    token: "dave-id-token",
    line_id: "U00000000000000000000000000000da7",
    name: "Dave",
};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 1,
            idle_timeout_secs: 60,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        auth: AuthConfig {
            environment: "test".to_string(),
            dev_auth_token: DEV_TOKEN.to_string(),
            login_channel_id: "1650000000".to_string(),
            verify_url: "http://127.0.0.1:9/verify".to_string(),
            verify_timeout_ms: 500,
        },
        line: LineConfig::default(),
        notifications: NotificationsConfig::default(),
        reminders: RemindersConfig::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryTradeStore>,
    pub gateway: Arc<MockPushGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryTradeStore::new());
        let gateway = Arc::new(MockPushGateway::new());
        let verifier = [ALICE, BOB, CAROL, DAVE]
            .iter()
            .fold(MockIdentityVerifier::new(), |v, id| {
                v.with_token(id.token, id.line_id)
            });

        let state = AppState::new(config, store.clone(), gateway.clone(), Arc::new(verifier));
        Self {
            router: create_app(state.clone()),
            state,
            store,
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!(
                    "Non-JSON body. Status: {}, Body: {:?}",
                    status,
                    String::from_utf8_lossy(&body)
                )
            })
        };
        (status, json)
    }

    /// Call as `who` with a real (verified) token.
    pub async fn call(
        &self,
        who: Identity,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(request(method, uri, Some(who.token), None, body))
            .await
    }

    /// Wait for request-triggered notifications.
    pub async fn flush_notifications(&self) {
        self.state.dispatcher.flush().await;
    }

    pub async fn register(&self, who: Identity) -> String {
        let (status, json) = self
            .call(who, Method::POST, "/api/users", Some(json!({ "name": who.name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);
        json["id"].as_str().unwrap().to_string()
    }

    /// Create a group owned by `owner` and return (group_id, invitation_code).
    pub async fn create_group(&self, owner: Identity, name: &str) -> (String, String) {
        let (status, json) = self
            .call(
                owner,
                Method::POST,
                "/api/groups",
                Some(json!({ "group_name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create group failed: {}", json);
        (
            json["id"].as_str().unwrap().to_string(),
            json["invitation_code"].as_str().unwrap().to_string(),
        )
    }

    pub async fn join(&self, who: Identity, code: &str) -> StatusCode {
        self.call(
            who,
            Method::POST,
            "/api/groups/join",
            Some(json!({ "invitation_code": code })),
        )
        .await
        .0
    }

    /// Trade starting `start_in_hours` from now, lasting four hours.
    pub async fn create_trade(&self, who: Identity, group_id: &str, start_in_hours: i64) -> String {
        let (status, json) = self
            .call(
                who,
                Method::POST,
                &format!("/api/groups/{}/trades", group_id),
                Some(trade_body(start_in_hours, "500 yen")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create trade failed: {}", json);
        json["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn trade_body(start_in_hours: i64, bounty: &str) -> Value {
    let start = chrono::Utc::now() + chrono::Duration::hours(start_in_hours);
    let end = start + chrono::Duration::hours(4);
    json!({
        "start_at": start.to_rfc3339(),
        "end_at": end.to_rfc3339(),
        "bounty": bounty,
    })
}

/// Build a request with optional bearer token, dev subject and JSON body.
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    dev_subject: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(subject) = dev_subject {
        builder = builder.header("X-Dev-Sub", subject);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
