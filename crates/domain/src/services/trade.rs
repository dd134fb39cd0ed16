//! Shift trade lifecycle.
//!
//! Every guarded mutation goes to the store as one conditional operation;
//! this service only classifies the outcome and schedules notifications.
//! Notifications run on the [`NotificationDispatcher`] and never affect the
//! result returned to the caller.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::trade::{CreateTradeRequest, UpdateTradeDetailsRequest};
use crate::models::{NewTrade, Trade};
use crate::services::dispatch::NotificationDispatcher;
use crate::services::messages::MessageFormatter;
use crate::services::notification::Notifier;
use crate::store::TradeStore;

/// Returned when a claim loses the race or its guard does not match.
pub const CLAIM_CONFLICT_MESSAGE: &str = "Cannot accept trade. Possible reasons: trade not found, already filled, it's your own request, or you are not a member.";

pub const NOT_A_MEMBER_MESSAGE: &str = "You are not a member of this group";

/// The authenticated caller of a trade operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    /// Resolved through the development bypass; suppresses all pushes.
    pub bypassed: bool,
}

#[derive(Clone)]
pub struct TradeService {
    store: Arc<dyn TradeStore>,
    notifier: Notifier,
    dispatcher: NotificationDispatcher,
    messages: MessageFormatter,
}

impl TradeService {
    pub fn new(
        store: Arc<dyn TradeStore>,
        notifier: Notifier,
        dispatcher: NotificationDispatcher,
        messages: MessageFormatter,
    ) -> Self {
        Self {
            store,
            notifier,
            dispatcher,
            messages,
        }
    }

    /// Post a new OPEN trade and announce it to the other group members.
    pub async fn create(
        &self,
        actor: Actor,
        group_id: Uuid,
        request: CreateTradeRequest,
    ) -> Result<Trade, DomainError> {
        request.validate()?;
        if request.start_at >= request.end_at {
            return Err(DomainError::Validation(
                "Shift start must be before shift end".into(),
            ));
        }

        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Group not found or you are not a member".into()))?;
        if self
            .store
            .find_membership(group_id, actor.user_id)
            .await?
            .is_none()
        {
            return Err(DomainError::NotFound(
                "Group not found or you are not a member".into(),
            ));
        }

        let trade = self
            .store
            .create_trade(&NewTrade {
                group_id,
                requester_id: actor.user_id,
                shift_start_at: request.start_at,
                shift_end_at: request.end_at,
                bounty_description: request.bounty,
            })
            .await?;

        tracing::info!(
            trade_id = %trade.id,
            group_id = %group_id,
            requester_id = %actor.user_id,
            "Trade created"
        );

        if actor.bypassed {
            tracing::info!(trade_id = %trade.id, "Skipping multicast for dev-bypass request");
            return Ok(trade);
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let text = self.messages.new_trade(
            &group.name,
            trade.shift_start_at,
            trade.shift_end_at,
            &trade.bounty_description,
        );
        let requester_id = actor.user_id;
        self.dispatcher.spawn("trade_created", async move {
            match store.member_external_ids(group_id, requester_id).await {
                Ok(recipients) => {
                    let report = notifier.broadcast(&recipients, &text).await;
                    tracing::debug!(?report, "New trade broadcast finished");
                }
                Err(e) => tracing::error!(error = %e, "Failed to load member ids for broadcast"),
            }
        });

        Ok(trade)
    }

    /// OPEN trades of a group, newest first. Members only.
    pub async fn list_open(&self, actor: Actor, group_id: Uuid) -> Result<Vec<Trade>, DomainError> {
        self.require_member(group_id, actor.user_id).await?;
        Ok(self.store.list_open_trades(group_id).await?)
    }

    /// One trade of a group, any status. Members only.
    pub async fn get(
        &self,
        actor: Actor,
        group_id: Uuid,
        trade_id: Uuid,
    ) -> Result<Trade, DomainError> {
        self.require_member(group_id, actor.user_id).await?;
        self.store
            .find_trade(trade_id)
            .await?
            .filter(|t| t.group_id == group_id)
            .ok_or_else(|| DomainError::NotFound("Trade not found".into()))
    }

    /// Delete the caller's own OPEN trade.
    ///
    /// Missing trade, foreign trade and no-longer-open trade all surface as
    /// [`DomainError::CannotDelete`].
    pub async fn delete(&self, actor: Actor, trade_id: Uuid) -> Result<(), DomainError> {
        let deleted = self
            .store
            .delete_open_trade(trade_id, actor.user_id)
            .await?;
        if deleted == 0 {
            return Err(DomainError::CannotDelete);
        }
        tracing::info!(trade_id = %trade_id, requester_id = %actor.user_id, "Trade deleted");
        Ok(())
    }

    /// Claim an OPEN trade. Exactly one concurrent claimant wins; the rest
    /// get [`DomainError::Conflict`]. Never retried.
    pub async fn claim(
        &self,
        actor: Actor,
        group_id: Uuid,
        trade_id: Uuid,
    ) -> Result<Trade, DomainError> {
        self.require_member(group_id, actor.user_id).await?;

        let trade = self
            .store
            .claim_trade(trade_id, group_id, actor.user_id)
            .await?
            .ok_or_else(|| DomainError::Conflict(CLAIM_CONFLICT_MESSAGE.into()))?;

        tracing::info!(
            trade_id = %trade.id,
            group_id = %group_id,
            acceptor_id = %actor.user_id,
            "Trade claimed"
        );

        if actor.bypassed {
            tracing::info!(trade_id = %trade.id, "Skipping claim pushes for dev-bypass request");
            return Ok(trade);
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let messages = self.messages;
        let claimed = trade.clone();
        self.dispatcher.spawn("trade_claimed", async move {
            let acceptor = match store.find_user_by_id(actor.user_id).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load acceptor for claim notification");
                    None
                }
            };

            match store.find_user_by_id(claimed.requester_id).await {
                Ok(Some(requester)) => {
                    let text = messages.trade_filled(
                        claimed.shift_start_at,
                        claimed.shift_end_at,
                        acceptor.as_ref().map(|u| u.display_name.as_str()),
                    );
                    notifier.send(&requester.external_id, &text).await;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to load requester for claim notification"),
            }

            if let Some(acceptor) = acceptor {
                let text = messages.claim_confirmed(claimed.shift_start_at, claimed.shift_end_at);
                notifier.send(&acceptor.external_id, &text).await;
            }
        });

        Ok(trade)
    }

    /// Record that the requester paid the bounty. Any failure, including a
    /// trade that is missing or not the caller's, is
    /// [`DomainError::PaymentNotRecorded`].
    pub async fn mark_paid(&self, actor: Actor, trade_id: Uuid) -> Result<Trade, DomainError> {
        let trade = self
            .store
            .mark_trade_paid(trade_id, actor.user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, trade_id = %trade_id, "Failed to mark trade as paid");
                DomainError::PaymentNotRecorded
            })?
            .ok_or(DomainError::PaymentNotRecorded)?;

        tracing::info!(trade_id = %trade.id, requester_id = %actor.user_id, "Trade marked paid");

        let Some(acceptor_id) = trade.acceptor_id else {
            return Ok(trade);
        };
        if actor.bypassed {
            tracing::info!(trade_id = %trade.id, "Skipping paid push for dev-bypass request");
            return Ok(trade);
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let messages = self.messages;
        let paid = trade.clone();
        self.dispatcher.spawn("trade_paid", async move {
            let acceptor = match store.find_user_by_id(acceptor_id).await {
                Ok(Some(user)) => user,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load acceptor for paid notification");
                    return;
                }
            };
            let requester_name = match store.find_user_by_id(paid.requester_id).await {
                Ok(Some(user)) => user.display_name,
                _ => crate::services::messages::FALLBACK_MEMBER_NAME.to_string(),
            };
            let text = messages.payment_recorded(&requester_name, paid.shift_start_at);
            notifier.send(&acceptor.external_id, &text).await;
        });

        Ok(trade)
    }

    /// Replace the free-text details. Requester only, any status.
    pub async fn update_details(
        &self,
        actor: Actor,
        group_id: Uuid,
        trade_id: Uuid,
        request: UpdateTradeDetailsRequest,
    ) -> Result<Trade, DomainError> {
        request.validate()?;

        self.store
            .find_trade(trade_id)
            .await?
            .filter(|t| t.group_id == group_id)
            .ok_or_else(|| DomainError::NotFound("Trade not found".into()))?;
        self.require_member(group_id, actor.user_id).await?;

        let trade = self
            .store
            .update_trade_details(trade_id, actor.user_id, &request.details)
            .await?
            .ok_or_else(|| DomainError::Forbidden("Only requester can update details".into()))?;

        tracing::info!(trade_id = %trade.id, "Trade details updated");
        Ok(trade)
    }

    async fn require_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        match self.store.find_membership(group_id, user_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::Forbidden(NOT_A_MEMBER_MESSAGE.into())),
        }
    }
}
