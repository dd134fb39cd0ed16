//! Shift trade repository for database operations.
//!
//! Every guarded transition is a single conditional statement; the affected
//! row (or its absence) is the only signal callers get.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::entities::{ReminderTargetEntity, TradeEntity};
use crate::metrics::QueryTimer;

/// Repository for shift trade database operations.
#[derive(Clone)]
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        group_id: Uuid,
        requester_id: Uuid,
        shift_start_at: DateTime<Utc>,
        shift_end_at: DateTime<Utc>,
        bounty_description: &str,
    ) -> Result<TradeEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_trade");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            INSERT INTO shift_trades (group_id, requester_id, shift_start_at, shift_end_at, bounty_description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, requester_id, shift_start_at, shift_end_at, bounty_description,
                      status, acceptor_id, is_paid, details, created_at, updated_at
            "#,
        )
        .bind(group_id)
        .bind(requester_id)
        .bind(shift_start_at)
        .bind(shift_end_at)
        .bind(bounty_description)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TradeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_trade_by_id");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            SELECT id, group_id, requester_id, shift_start_at, shift_end_at, bounty_description,
                   status, acceptor_id, is_paid, details, created_at, updated_at
            FROM shift_trades
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// OPEN trades of a group, newest first.
    pub async fn list_open(&self, group_id: Uuid) -> Result<Vec<TradeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_open_trades");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            SELECT id, group_id, requester_id, shift_start_at, shift_end_at, bounty_description,
                   status, acceptor_id, is_paid, details, created_at, updated_at
            FROM shift_trades
            WHERE group_id = $1 AND status = 'OPEN'
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_open(&self, id: Uuid, requester_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_open_trade");
        let result = sqlx::query(
            r#"
            DELETE FROM shift_trades
            WHERE id = $1 AND requester_id = $2 AND status = 'OPEN'
            "#,
        )
        .bind(id)
        .bind(requester_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// OPEN -> ACCEPTED in one statement. Concurrent callers serialize on the
    /// row lock; after the winner commits the others re-check `status` and
    /// match nothing.
    pub async fn claim(
        &self,
        id: Uuid,
        group_id: Uuid,
        acceptor_id: Uuid,
    ) -> Result<Option<TradeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("claim_trade");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE shift_trades t
            SET status = 'ACCEPTED', acceptor_id = $3, updated_at = NOW()
            WHERE t.id = $1
              AND t.group_id = $2
              AND t.status = 'OPEN'
              AND t.requester_id <> $3
              AND EXISTS (
                  SELECT 1
                  FROM group_members gm
                  JOIN job_groups g ON g.id = gm.group_id
                  WHERE gm.group_id = t.group_id AND gm.user_id = $3 AND g.deleted_at IS NULL
              )
            RETURNING t.id, t.group_id, t.requester_id, t.shift_start_at, t.shift_end_at,
                      t.bounty_description, t.status, t.acceptor_id, t.is_paid, t.details,
                      t.created_at, t.updated_at
            "#,
        )
        .bind(id)
        .bind(group_id)
        .bind(acceptor_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn mark_paid(
        &self,
        id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<TradeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("mark_trade_paid");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE shift_trades
            SET is_paid = TRUE, updated_at = NOW()
            WHERE id = $1 AND requester_id = $2
            RETURNING id, group_id, requester_id, shift_start_at, shift_end_at, bounty_description,
                      status, acceptor_id, is_paid, details, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(requester_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update_details(
        &self,
        id: Uuid,
        requester_id: Uuid,
        details: &str,
    ) -> Result<Option<TradeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_trade_details");
        let result = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE shift_trades
            SET details = $3, updated_at = NOW()
            WHERE id = $1 AND requester_id = $2
            RETURNING id, group_id, requester_id, shift_start_at, shift_end_at, bounty_description,
                      status, acceptor_id, is_paid, details, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(requester_id)
        .bind(details)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Close every OPEN trade of a group. Runs on the caller's executor so it
    /// commits together with the rest of the caller's transaction.
    pub async fn close_open_for_group<'e, E>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE shift_trades
            SET status = 'CLOSED', updated_at = NOW()
            WHERE group_id = $1 AND status = 'OPEN'
            "#,
        )
        .bind(group_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Close every OPEN trade requested by a user, on the caller's executor.
    pub async fn close_open_for_requester<'e, E>(
        executor: E,
        requester_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE shift_trades
            SET status = 'CLOSED', updated_at = NOW()
            WHERE requester_id = $1 AND status = 'OPEN'
            "#,
        )
        .bind(requester_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// OPEN trades in live groups starting in `[from, until)`.
    pub async fn unfilled_starting_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReminderTargetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("unfilled_trades_in_window");
        let result = sqlx::query_as::<_, ReminderTargetEntity>(
            r#"
            SELECT t.id, t.group_id, t.shift_start_at, t.shift_end_at, u.external_id
            FROM shift_trades t
            JOIN users u ON u.id = t.requester_id
            JOIN job_groups g ON g.id = t.group_id
            WHERE t.status = 'OPEN'
              AND t.shift_start_at >= $1
              AND t.shift_start_at < $2
              AND g.deleted_at IS NULL
            ORDER BY t.shift_start_at
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
