//! In-process [`TradeStore`] backed by a single mutex.
//!
//! Suitable for tests and local development without PostgreSQL. Every
//! operation holds the state lock for its whole duration, which gives the
//! same all-or-nothing visibility as a row-level conditional UPDATE.
//! Multi-statement operations stage their writes on a copy of the state and
//! swap it in only at the end, so an injected failure between statements
//! leaves no partial effect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{StoreError, TradeStore};
use crate::models::user::{tombstone_external_id, WITHDRAWN_DISPLAY_NAME};
use crate::models::{
    Group, GroupRole, Membership, NewTrade, ReminderTarget, Trade, TradeStatus, User,
};

/// Failure injection points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// Fail after the first statement of a multi-statement transaction
    /// (create group, dissolve group, withdraw user).
    MidTransaction,
    /// Every operation fails as if the database were unreachable.
    Unavailable,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    trades: Vec<Trade>,
}

impl MemoryState {
    fn live_group(&self, id: Uuid) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.id == id && g.deleted_at.is_none())
    }

    fn is_member(&self, group_id: Uuid, user_id: Uuid) -> bool {
        self.live_group(group_id).is_some()
            && self
                .memberships
                .iter()
                .any(|m| m.group_id == group_id && m.user_id == user_id)
    }

    fn close_open_trades(&mut self, matches: impl Fn(&Trade) -> bool) -> u64 {
        let now = Utc::now();
        let mut closed = 0;
        for trade in self
            .trades
            .iter_mut()
            .filter(|t| t.status == TradeStatus::Open && matches(t))
        {
            trade.status = TradeStatus::Closed;
            trade.updated_at = now;
            closed += 1;
        }
        closed
    }

    fn trade_mut(&mut self, id: Uuid) -> Option<&mut Trade> {
        self.trades.iter_mut().find(|t| t.id == id)
    }
}

/// In-memory trade store.
#[derive(Debug, Default)]
pub struct MemoryTradeStore {
    state: Mutex<MemoryState>,
    fail_point: StdMutex<Option<FailPoint>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a failure injection point. Stays armed until cleared.
    pub fn inject_failure(&self, point: FailPoint) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    pub fn clear_failure(&self) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Group by id including dissolved ones.
    pub async fn find_group_including_dissolved(&self, id: Uuid) -> Option<Group> {
        let state = self.state.lock().await;
        state.groups.iter().find(|g| g.id == id).cloned()
    }

    /// User by id including withdrawn ones.
    pub async fn find_user_including_withdrawn(&self, id: Uuid) -> Option<User> {
        let state = self.state.lock().await;
        state.users.iter().find(|u| u.id == id).cloned()
    }

    /// Number of membership rows for (group, user).
    pub async fn membership_count(&self, group_id: Uuid, user_id: Uuid) -> usize {
        let state = self.state.lock().await;
        state
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.user_id == user_id)
            .count()
    }

    fn armed(&self) -> Option<FailPoint> {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self.armed() {
            Some(FailPoint::Unavailable) => {
                Err(StoreError::Backend("store unavailable (injected)".into()))
            }
            _ => Ok(()),
        }
    }

    fn check_mid_transaction(&self) -> Result<(), StoreError> {
        match self.armed() {
            Some(FailPoint::MidTransaction) => Err(StoreError::Backend(
                "transaction aborted between statements (injected)".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn create_user(
        &self,
        external_id: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
    ) -> Result<User, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.external_id == external_id) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            display_name: display_name.to_string(),
            profile_image_url: profile_image_url.map(str::to_string),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.external_id == external_id && u.deleted_at.is_none())
            .cloned())
    }

    async fn withdraw_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state
            .users
            .iter()
            .any(|u| u.id == user_id && u.deleted_at.is_none())
        {
            return Err(StoreError::NotFound);
        }

        let mut staged = state.clone();
        let closed = staged.close_open_trades(|t| t.requester_id == user_id);
        self.check_mid_transaction()?;

        let now = Utc::now();
        if let Some(user) = staged.users.iter_mut().find(|u| u.id == user_id) {
            user.external_id = tombstone_external_id(user_id);
            user.display_name = WITHDRAWN_DISPLAY_NAME.to_string();
            user.profile_image_url = None;
            user.deleted_at = Some(now);
            user.updated_at = now;
        }

        *state = staged;
        Ok(closed)
    }

    async fn create_group(
        &self,
        name: &str,
        invitation_code: &str,
        owner_id: Uuid,
    ) -> Result<(Group, Membership), StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|g| g.invitation_code == invitation_code) {
            return Err(StoreError::AlreadyExists);
        }
        if !state.users.iter().any(|u| u.id == owner_id) {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now();
        let mut staged = state.clone();
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            invitation_code: invitation_code.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        staged.groups.push(group.clone());
        self.check_mid_transaction()?;

        let membership = Membership {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_id: owner_id,
            role: GroupRole::Admin,
            joined_at: now,
        };
        staged.memberships.push(membership.clone());

        *state = staged;
        Ok((group, membership))
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.live_group(id).cloned())
    }

    async fn find_group_by_invitation_code(
        &self,
        code: &str,
    ) -> Result<Option<Group>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .groups
            .iter()
            .find(|g| g.invitation_code == code && g.deleted_at.is_none())
            .cloned())
    }

    async fn list_user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.live_group(m.group_id).cloned())
            .collect())
    }

    async fn rename_group(
        &self,
        id: Uuid,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == id && g.owner_id == owner_id && g.deleted_at.is_none());
        Ok(group.map(|g| {
            g.name = name.to_string();
            g.updated_at = Utc::now();
            g.clone()
        }))
    }

    async fn dissolve_group(&self, id: Uuid, owner_id: Uuid) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state
            .live_group(id)
            .is_some_and(|g| g.owner_id == owner_id)
        {
            return Err(StoreError::NotFound);
        }

        let mut staged = state.clone();
        let closed = staged.close_open_trades(|t| t.group_id == id);
        self.check_mid_transaction()?;

        let now = Utc::now();
        if let Some(group) = staged.groups.iter_mut().find(|g| g.id == id) {
            group.deleted_at = Some(now);
            group.updated_at = now;
        }

        *state = staged;
        Ok(closed)
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Membership, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state.groups.iter().any(|g| g.id == group_id)
            || !state.users.iter().any(|u| u.id == user_id)
        {
            return Err(StoreError::NotFound);
        }
        if state
            .memberships
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Err(StoreError::AlreadyExists);
        }
        let membership = Membership {
            id: Uuid::new_v4(),
            group_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        state.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        if state.live_group(group_id).is_none() {
            return Ok(None);
        }
        Ok(state
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }

    async fn member_external_ids(
        &self,
        group_id: Uuid,
        exclude_user_id: Uuid,
    ) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.user_id != exclude_user_id)
            .filter_map(|m| {
                state
                    .users
                    .iter()
                    .find(|u| u.id == m.user_id && u.deleted_at.is_none())
                    .map(|u| u.external_id.clone())
            })
            .collect())
    }

    async fn create_trade(&self, trade: &NewTrade) -> Result<Trade, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state.groups.iter().any(|g| g.id == trade.group_id)
            || !state.users.iter().any(|u| u.id == trade.requester_id)
        {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        let created = Trade {
            id: Uuid::new_v4(),
            group_id: trade.group_id,
            requester_id: trade.requester_id,
            shift_start_at: trade.shift_start_at,
            shift_end_at: trade.shift_end_at,
            bounty_description: trade.bounty_description.clone(),
            status: TradeStatus::Open,
            acceptor_id: None,
            is_paid: false,
            details: String::new(),
            created_at: now,
            updated_at: now,
        };
        state.trades.push(created.clone());
        Ok(created)
    }

    async fn find_trade(&self, id: Uuid) -> Result<Option<Trade>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.trades.iter().find(|t| t.id == id).cloned())
    }

    async fn list_open_trades(&self, group_id: Uuid) -> Result<Vec<Trade>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .trades
            .iter()
            .rev()
            .filter(|t| t.group_id == group_id && t.status == TradeStatus::Open)
            .cloned()
            .collect())
    }

    async fn delete_open_trade(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let before = state.trades.len();
        state.trades.retain(|t| {
            !(t.id == trade_id && t.requester_id == requester_id && t.status == TradeStatus::Open)
        });
        Ok((before - state.trades.len()) as u64)
    }

    async fn claim_trade(
        &self,
        trade_id: Uuid,
        group_id: Uuid,
        acceptor_id: Uuid,
    ) -> Result<Option<Trade>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let is_member = state.is_member(group_id, acceptor_id);
        let Some(trade) = state.trade_mut(trade_id) else {
            return Ok(None);
        };
        let guard = trade.group_id == group_id
            && trade.status.can_transition_to(TradeStatus::Accepted)
            && trade.requester_id != acceptor_id
            && is_member;
        if !guard {
            return Ok(None);
        }
        trade.status = TradeStatus::Accepted;
        trade.acceptor_id = Some(acceptor_id);
        trade.updated_at = Utc::now();
        Ok(Some(trade.clone()))
    }

    async fn mark_trade_paid(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<Trade>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        Ok(state
            .trade_mut(trade_id)
            .filter(|t| t.requester_id == requester_id)
            .map(|t| {
                t.is_paid = true;
                t.updated_at = Utc::now();
                t.clone()
            }))
    }

    async fn update_trade_details(
        &self,
        trade_id: Uuid,
        requester_id: Uuid,
        details: &str,
    ) -> Result<Option<Trade>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        Ok(state
            .trade_mut(trade_id)
            .filter(|t| t.requester_id == requester_id)
            .map(|t| {
                t.details = details.to_string();
                t.updated_at = Utc::now();
                t.clone()
            }))
    }

    async fn unfilled_trades_starting_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReminderTarget>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut targets: Vec<ReminderTarget> = state
            .trades
            .iter()
            .filter(|t| {
                t.status == TradeStatus::Open
                    && t.shift_start_at >= from
                    && t.shift_start_at < until
                    && state.live_group(t.group_id).is_some()
            })
            .filter_map(|t| {
                state
                    .users
                    .iter()
                    .find(|u| u.id == t.requester_id)
                    .map(|u| ReminderTarget {
                        trade_id: t.id,
                        group_id: t.group_id,
                        shift_start_at: t.shift_start_at,
                        shift_end_at: t.shift_end_at,
                        requester_external_id: u.external_id.clone(),
                    })
            })
            .collect();
        targets.sort_by_key(|t| t.shift_start_at);
        Ok(targets)
    }
}
