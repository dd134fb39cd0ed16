//! LINE Messaging API push gateway.
//!
//! Implements [`PushGateway`] over the `message/push` and
//! `message/multicast` endpoints with a channel access token.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use domain::services::{MulticastOutcome, PushError, PushGateway};

use crate::config::LineConfig;

/// Recipient cap of a single multicast call.
pub const MULTICAST_LIMIT: usize = 500;

/// Push gateway talking to the LINE Messaging API.
pub struct LinePushGateway {
    client: Client,
    base_url: String,
    channel_token: String,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct MulticastRequest<'a> {
    to: &'a [String],
    messages: [TextMessage<'a>; 1],
}

fn text(text: &str) -> [TextMessage<'_>; 1] {
    [TextMessage { kind: "text", text }]
}

impl LinePushGateway {
    pub fn new(config: &LineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            channel_token: config.channel_token.clone(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), PushError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_token)
            .json(body)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PushGateway for LinePushGateway {
    async fn push(&self, to: &str, text_body: &str) -> Result<(), PushError> {
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to,
                messages: text(text_body),
            },
        )
        .await
    }

    /// Sends every chunk even when an earlier one fails.
    async fn multicast(&self, to: &[String], text_body: &str) -> MulticastOutcome {
        let mut outcome = MulticastOutcome::default();
        for chunk in to.chunks(MULTICAST_LIMIT) {
            let result = self
                .post(
                    "/v2/bot/message/multicast",
                    &MulticastRequest {
                        to: chunk,
                        messages: text(text_body),
                    },
                )
                .await;
            outcome.record(chunk, result);
        }
        outcome
    }
}

/// Gateway used when LINE push is disabled. Messages only reach the log.
#[derive(Debug, Default)]
pub struct ConsolePushGateway;

#[async_trait]
impl PushGateway for ConsolePushGateway {
    async fn push(&self, to: &str, text_body: &str) -> Result<(), PushError> {
        tracing::info!(to = %to, text = %text_body, "Push (console)");
        Ok(())
    }

    async fn multicast(&self, to: &[String], text_body: &str) -> MulticastOutcome {
        tracing::info!(recipients = to.len(), text = %text_body, "Multicast (console)");
        MulticastOutcome::from_result(to, Ok(()))
    }
}
