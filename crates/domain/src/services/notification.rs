//! Notification fan-out.
//!
//! Provides the push gateway abstraction and a [`Notifier`] that filters
//! unroutable recipients before handing messages to the gateway. Delivery is
//! best effort: failures are logged and reported, never returned as errors.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use shared::validation::{filter_valid_external_ids, is_valid_external_id};

/// Failure reported by a push gateway.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(String),
    #[error("push rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound text-message channel.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one message to one recipient.
    async fn push(&self, to: &str, text: &str) -> Result<(), PushError>;

    /// Deliver the same message to several recipients. A gateway may split
    /// the list into several calls; each part succeeds or fails on its own.
    async fn multicast(&self, to: &[String], text: &str) -> MulticastOutcome;
}

/// Per-recipient result of one multicast.
#[derive(Debug, Default)]
pub struct MulticastOutcome {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    pub errors: Vec<PushError>,
}

impl MulticastOutcome {
    /// Fold the result of one gateway call covering `to` into the outcome.
    pub fn record(&mut self, to: &[String], result: Result<(), PushError>) {
        match result {
            Ok(()) => self.delivered.extend_from_slice(to),
            Err(e) => {
                self.failed.extend_from_slice(to);
                self.errors.push(e);
            }
        }
    }

    pub fn from_result(to: &[String], result: Result<(), PushError>) -> Self {
        let mut outcome = Self::default();
        outcome.record(to, result);
        outcome
    }
}

/// Per-call delivery accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl FanoutReport {
    pub fn merge(self, other: FanoutReport) -> FanoutReport {
        FanoutReport {
            delivered: self.delivered + other.delivered,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn PushGateway>,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }

    /// Send `text` to every routable identity in `recipients` with a single
    /// multicast call. Malformed identities are dropped and counted.
    pub async fn broadcast(&self, recipients: &[String], text: &str) -> FanoutReport {
        let (valid, skipped) = filter_valid_external_ids(recipients);
        if skipped > 0 {
            tracing::warn!(skipped = skipped, "Multicast skipped invalid recipient ids");
        }

        let mut report = FanoutReport {
            skipped,
            ..Default::default()
        };
        if valid.is_empty() {
            return report;
        }

        let outcome = self.gateway.multicast(&valid, text).await;
        for e in &outcome.errors {
            tracing::error!(error = %e, "Multicast call failed");
        }
        if !outcome.failed.is_empty() {
            tracing::warn!(
                delivered = outcome.delivered.len(),
                failed = outcome.failed.len(),
                "Multicast partially failed"
            );
        }
        report.delivered = outcome.delivered.len();
        report.failed = outcome.failed.len();
        report
    }

    /// Send `text` to a single recipient if its identity is routable.
    pub async fn send(&self, recipient: &str, text: &str) -> FanoutReport {
        if !is_valid_external_id(recipient) {
            tracing::warn!("Push skipped for invalid recipient id");
            return FanoutReport {
                skipped: 1,
                ..Default::default()
            };
        }

        match self.gateway.push(recipient.trim(), text).await {
            Ok(()) => FanoutReport {
                delivered: 1,
                ..Default::default()
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to push message");
                FanoutReport {
                    failed: 1,
                    ..Default::default()
                }
            }
        }
    }
}

/// A message captured by [`MockPushGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: Vec<String>,
    pub text: String,
}

/// Recording gateway for development and testing.
///
/// Keeps every accepted message in memory; can be told to fail instead.
#[derive(Debug, Default)]
pub struct MockPushGateway {
    sent: Mutex<Vec<SentMessage>>,
    simulate_failure: bool,
}

impl MockPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            simulate_failure: true,
        }
    }

    /// Snapshot of all delivered messages in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages that reached `recipient`, individually or via multicast.
    pub fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.iter().any(|r| r == recipient))
            .map(|m| m.text)
            .collect()
    }

    fn record(&self, to: Vec<String>, text: &str) -> Result<(), PushError> {
        if self.simulate_failure {
            tracing::warn!("Mock push gateway simulating failure");
            return Err(PushError::Transport("simulated failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                to,
                text: text.to_string(),
            });
        Ok(())
    }
}

#[async_trait]
impl PushGateway for MockPushGateway {
    async fn push(&self, to: &str, text: &str) -> Result<(), PushError> {
        self.record(vec![to.to_string()], text)
    }

    async fn multicast(&self, to: &[String], text: &str) -> MulticastOutcome {
        MulticastOutcome::from_result(to, self.record(to.to_vec(), text))
    }
}
