//! Shift trade entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{ReminderTarget, Trade, TradeStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for trade_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "trade_status", rename_all = "UPPERCASE")]
pub enum TradeStatusDb {
    Open,
    Accepted,
    Closed,
}

impl From<TradeStatusDb> for TradeStatus {
    fn from(status: TradeStatusDb) -> Self {
        match status {
            TradeStatusDb::Open => TradeStatus::Open,
            TradeStatusDb::Accepted => TradeStatus::Accepted,
            TradeStatusDb::Closed => TradeStatus::Closed,
        }
    }
}

/// Database row mapping for the shift_trades table.
#[derive(Debug, Clone, FromRow)]
pub struct TradeEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub requester_id: Uuid,
    pub shift_start_at: DateTime<Utc>,
    pub shift_end_at: DateTime<Utc>,
    pub bounty_description: String,
    pub status: TradeStatusDb,
    pub acceptor_id: Option<Uuid>,
    pub is_paid: bool,
    pub details: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TradeEntity> for Trade {
    fn from(entity: TradeEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            requester_id: entity.requester_id,
            shift_start_at: entity.shift_start_at,
            shift_end_at: entity.shift_end_at,
            bounty_description: entity.bounty_description,
            status: entity.status.into(),
            acceptor_id: entity.acceptor_id,
            is_paid: entity.is_paid,
            details: entity.details,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Row returned by the reminder window query (trade joined with requester).
#[derive(Debug, Clone, FromRow)]
pub struct ReminderTargetEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub shift_start_at: DateTime<Utc>,
    pub shift_end_at: DateTime<Utc>,
    pub external_id: String,
}

impl From<ReminderTargetEntity> for ReminderTarget {
    fn from(entity: ReminderTargetEntity) -> Self {
        Self {
            trade_id: entity.id,
            group_id: entity.group_id,
            shift_start_at: entity.shift_start_at,
            shift_end_at: entity.shift_end_at,
            requester_external_id: entity.external_id,
        }
    }
}
