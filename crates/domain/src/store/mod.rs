//! Storage contract for trades, groups, memberships and users.
//!
//! Backends (PostgreSQL in the `persistence` crate, [`MemoryTradeStore`] for
//! tests and local runs) implement [`TradeStore`] so the services never see
//! SQL. Every mutation that guards a business invariant is expressed as a
//! single conditional operation: the preconditions travel with the write and
//! the result says whether anything matched. Callers never read-then-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Group, GroupRole, Membership, NewTrade, ReminderTarget, Trade, User};

mod memory;

pub use memory::{FailPoint, MemoryTradeStore};

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Cheap connectivity probe used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;

    // ---------------------------------------------------------------- users

    /// Insert a user. `AlreadyExists` if the external identity is taken.
    async fn create_user(
        &self,
        external_id: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
    ) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Active (not withdrawn) user with this external identity.
    async fn find_user_by_external_id(&self, external_id: &str)
        -> Result<Option<User>, StoreError>;

    /// Close the user's OPEN trades and anonymize the account in one
    /// transaction. Returns the number of trades closed. `NotFound` (with
    /// nothing changed) if the user is unknown or already withdrawn.
    async fn withdraw_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    // --------------------------------------------------------------- groups

    /// Insert a group and its owner's ADMIN membership in one transaction.
    /// `AlreadyExists` if the invitation code collides.
    async fn create_group(
        &self,
        name: &str,
        invitation_code: &str,
        owner_id: Uuid,
    ) -> Result<(Group, Membership), StoreError>;

    /// Group by id, excluding dissolved groups.
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError>;

    async fn find_group_by_invitation_code(
        &self,
        code: &str,
    ) -> Result<Option<Group>, StoreError>;

    /// Live groups the user belongs to, newest membership first.
    async fn list_user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError>;

    /// Rename, guarded by ownership. `None` when nothing matched.
    async fn rename_group(
        &self,
        id: Uuid,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>, StoreError>;

    /// Close the group's OPEN trades and soft-delete it in one transaction.
    /// Returns the number of trades closed. `NotFound` (with nothing changed)
    /// if the group is not live or not owned by `owner_id`.
    async fn dissolve_group(&self, id: Uuid, owner_id: Uuid) -> Result<u64, StoreError>;

    /// Insert a membership. `AlreadyExists` on a duplicate (group, user).
    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Membership, StoreError>;

    /// Membership in a live group.
    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    /// External identities of every active member except `exclude_user_id`.
    async fn member_external_ids(
        &self,
        group_id: Uuid,
        exclude_user_id: Uuid,
    ) -> Result<Vec<String>, StoreError>;

    // --------------------------------------------------------------- trades

    async fn create_trade(&self, trade: &NewTrade) -> Result<Trade, StoreError>;

    async fn find_trade(&self, id: Uuid) -> Result<Option<Trade>, StoreError>;

    /// OPEN trades of a group, newest first.
    async fn list_open_trades(&self, group_id: Uuid) -> Result<Vec<Trade>, StoreError>;

    /// Delete where id, requester and OPEN status all match. Returns rows
    /// affected.
    async fn delete_open_trade(&self, trade_id: Uuid, requester_id: Uuid)
        -> Result<u64, StoreError>;

    /// Atomic OPEN -> ACCEPTED transition guarded by trade id, group id,
    /// OPEN status, acceptor != requester and acceptor membership. `None`
    /// when the guard did not match; at most one concurrent caller gets
    /// `Some`.
    async fn claim_trade(
        &self,
        trade_id: Uuid,
        group_id: Uuid,
        acceptor_id: Uuid,
    ) -> Result<Option<Trade>, StoreError>;

    /// Set the paid flag where id and requester match.
    async fn mark_trade_paid(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<Trade>, StoreError>;

    /// Replace details where id and requester match.
    async fn update_trade_details(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
        details: &str,
    ) -> Result<Option<Trade>, StoreError>;

    /// OPEN trades in live groups whose shift starts in `[from, until)`,
    /// joined with the requester's external identity.
    async fn unfilled_trades_starting_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReminderTarget>, StoreError>;
}
