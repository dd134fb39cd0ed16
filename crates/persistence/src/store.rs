//! PostgreSQL-backed [`TradeStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::user::{tombstone_external_id, WITHDRAWN_DISPLAY_NAME};
use domain::models::{Group, GroupRole, Membership, NewTrade, ReminderTarget, Trade, User};
use domain::store::{StoreError, TradeStore};

use crate::metrics::record_store_error;
use crate::repositories::{GroupRepository, TradeRepository, UserRepository};

/// Production store over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgTradeStore {
    pool: PgPool,
    users: UserRepository,
    groups: GroupRepository,
    trades: TradeRepository,
}

impl PgTradeStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            trades: TradeRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Classify a driver error into the storage taxonomy.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
        if db.is_check_violation() {
            return StoreError::Conflict;
        }
    }
    StoreError::Backend(err.to_string())
}

/// Map and count an error for `operation`.
fn store_err(operation: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| {
        let mapped = classify(err);
        let kind = match &mapped {
            StoreError::NotFound => "not_found",
            StoreError::AlreadyExists => "already_exists",
            StoreError::Conflict => "conflict",
            StoreError::Backend(msg) => {
                tracing::error!(operation = operation, error = %msg, "Database operation failed");
                "backend"
            }
        };
        record_store_error(operation, kind);
        mapped
    }
}

#[async_trait]
impl TradeStore for PgTradeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_err("ping"))
    }

    async fn create_user(
        &self,
        external_id: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
    ) -> Result<User, StoreError> {
        self.users
            .create(external_id, display_name, profile_image_url)
            .await
            .map(Into::into)
            .map_err(store_err("create_user"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .find_by_id(id)
            .await
            .map_err(store_err("find_user_by_id"))?
            .map(Into::into))
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .find_active_by_external_id(external_id)
            .await
            .map_err(store_err("find_user_by_external_id"))?
            .map(Into::into))
    }

    async fn withdraw_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        self.users
            .withdraw(
                user_id,
                &tombstone_external_id(user_id),
                WITHDRAWN_DISPLAY_NAME,
            )
            .await
            .map_err(store_err("withdraw_user"))?
            .ok_or(StoreError::NotFound)
    }

    async fn create_group(
        &self,
        name: &str,
        invitation_code: &str,
        owner_id: Uuid,
    ) -> Result<(Group, Membership), StoreError> {
        let (group, member) = self
            .groups
            .create_with_admin(name, invitation_code, owner_id)
            .await
            .map_err(store_err("create_group"))?;
        Ok((group.into(), member.into()))
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self
            .groups
            .find_live_by_id(id)
            .await
            .map_err(store_err("find_group"))?
            .map(Into::into))
    }

    async fn find_group_by_invitation_code(
        &self,
        code: &str,
    ) -> Result<Option<Group>, StoreError> {
        Ok(self
            .groups
            .find_live_by_code(code)
            .await
            .map_err(store_err("find_group_by_code"))?
            .map(Into::into))
    }

    async fn list_user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError> {
        Ok(self
            .groups
            .list_for_user(user_id)
            .await
            .map_err(store_err("list_user_groups"))?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn rename_group(
        &self,
        id: Uuid,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>, StoreError> {
        Ok(self
            .groups
            .rename(id, owner_id, name)
            .await
            .map_err(store_err("rename_group"))?
            .map(Into::into))
    }

    async fn dissolve_group(&self, id: Uuid, owner_id: Uuid) -> Result<u64, StoreError> {
        self.groups
            .dissolve(id, owner_id)
            .await
            .map_err(store_err("dissolve_group"))?
            .ok_or(StoreError::NotFound)
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Membership, StoreError> {
        self.groups
            .add_member(group_id, user_id, role.into())
            .await
            .map(Into::into)
            .map_err(store_err("add_member"))
    }

    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .groups
            .find_membership(group_id, user_id)
            .await
            .map_err(store_err("find_membership"))?
            .map(Into::into))
    }

    async fn member_external_ids(
        &self,
        group_id: Uuid,
        exclude_user_id: Uuid,
    ) -> Result<Vec<String>, StoreError> {
        self.groups
            .member_external_ids(group_id, exclude_user_id)
            .await
            .map_err(store_err("member_external_ids"))
    }

    async fn create_trade(&self, trade: &NewTrade) -> Result<Trade, StoreError> {
        self.trades
            .create(
                trade.group_id,
                trade.requester_id,
                trade.shift_start_at,
                trade.shift_end_at,
                &trade.bounty_description,
            )
            .await
            .map(Into::into)
            .map_err(store_err("create_trade"))
    }

    async fn find_trade(&self, id: Uuid) -> Result<Option<Trade>, StoreError> {
        Ok(self
            .trades
            .find_by_id(id)
            .await
            .map_err(store_err("find_trade"))?
            .map(Into::into))
    }

    async fn list_open_trades(&self, group_id: Uuid) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .trades
            .list_open(group_id)
            .await
            .map_err(store_err("list_open_trades"))?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn delete_open_trade(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.trades
            .delete_open(trade_id, requester_id)
            .await
            .map_err(store_err("delete_open_trade"))
    }

    async fn claim_trade(
        &self,
        trade_id: Uuid,
        group_id: Uuid,
        acceptor_id: Uuid,
    ) -> Result<Option<Trade>, StoreError> {
        Ok(self
            .trades
            .claim(trade_id, group_id, acceptor_id)
            .await
            .map_err(store_err("claim_trade"))?
            .map(Into::into))
    }

    async fn mark_trade_paid(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<Trade>, StoreError> {
        Ok(self
            .trades
            .mark_paid(trade_id, requester_id)
            .await
            .map_err(store_err("mark_trade_paid"))?
            .map(Into::into))
    }

    async fn update_trade_details(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
        details: &str,
    ) -> Result<Option<Trade>, StoreError> {
        Ok(self
            .trades
            .update_details(trade_id, requester_id, details)
            .await
            .map_err(store_err("update_trade_details"))?
            .map(Into::into))
    }

    async fn unfilled_trades_starting_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReminderTarget>, StoreError> {
        Ok(self
            .trades
            .unfilled_starting_between(from, until)
            .await
            .map_err(store_err("unfilled_trades_in_window"))?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
