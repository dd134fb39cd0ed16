//! Shift trade domain models.
//!
//! A trade has two orthogonal facets. Fulfillment moves `OPEN` to either
//! `ACCEPTED` (someone claimed it) or `CLOSED` (its group dissolved or its
//! requester withdrew); neither terminal state ever returns to `OPEN`.
//! Settlement is the independent `is_paid` flag, meaningful once accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Fulfillment status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Accepted,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Accepted => "ACCEPTED",
            TradeStatus::Closed => "CLOSED",
        }
    }

    /// Returns true if the fulfillment state machine allows `self -> next`.
    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        matches!(
            (self, next),
            (TradeStatus::Open, TradeStatus::Accepted) | (TradeStatus::Open, TradeStatus::Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "ACCEPTED" => Ok(TradeStatus::Accepted),
            "CLOSED" => Ok(TradeStatus::Closed),
            _ => Err(format!("Invalid trade status: {}", s)),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A posted shift its requester wants someone else to work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Trade {
    pub id: Uuid,
    pub group_id: Uuid,
    pub requester_id: Uuid,
    pub shift_start_at: DateTime<Utc>,
    pub shift_end_at: DateTime<Utc>,
    pub bounty_description: String,
    pub status: TradeStatus,
    pub acceptor_id: Option<Uuid>,
    pub is_paid: bool,
    pub details: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to persist a new trade. Status starts `OPEN`, unpaid,
/// without acceptor.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub group_id: Uuid,
    pub requester_id: Uuid,
    pub shift_start_at: DateTime<Utc>,
    pub shift_end_at: DateTime<Utc>,
    pub bounty_description: String,
}

/// An unfilled trade that is due for a start-time reminder.
#[derive(Debug, Clone)]
pub struct ReminderTarget {
    pub trade_id: Uuid,
    pub group_id: Uuid,
    pub shift_start_at: DateTime<Utc>,
    pub shift_end_at: DateTime<Utc>,
    pub requester_external_id: String,
}

/// Request payload for posting a trade.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateTradeRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,

    #[validate(length(max = 200, message = "Bounty must be at most 200 characters"))]
    pub bounty: String,
}

/// Request payload for editing trade details.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateTradeDetailsRequest {
    #[validate(length(max = 2000, message = "Details must be at most 2000 characters"))]
    pub details: String,
}

/// Plain message response used by delete endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
