//! User registration, lookup and withdrawal.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::user::{RegisterUserRequest, WithdrawResponse};
use crate::models::User;
use crate::store::{StoreError, TradeStore};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn TradeStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    /// Register the resolved external identity.
    pub async fn register(
        &self,
        external_id: &str,
        request: RegisterUserRequest,
    ) -> Result<User, DomainError> {
        request.validate()?;
        let user = self
            .store
            .create_user(
                external_id,
                request.name.trim(),
                request.profile_image_url.as_deref(),
            )
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => DomainError::Conflict("User already registered".into()),
                other => other.into(),
            })?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Public lookup. Withdrawn users are not found.
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<User, DomainError> {
        self.store
            .find_user_by_external_id(external_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found".into()))
    }

    /// Map an authenticated identity to its registered user.
    pub async fn resolve(&self, external_id: &str) -> Result<User, DomainError> {
        self.store
            .find_user_by_external_id(external_id)
            .await?
            .ok_or(DomainError::NotRegistered)
    }

    /// Close the user's OPEN trades and anonymize the account in one
    /// transaction.
    pub async fn withdraw(&self, user_id: Uuid) -> Result<WithdrawResponse, DomainError> {
        let closed = match self.store.withdraw_user(user_id).await {
            Ok(closed) => closed,
            Err(StoreError::NotFound) => return Err(DomainError::NotRegistered),
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Withdrawal rolled back");
                return Err(e.into());
            }
        };
        tracing::info!(user_id = %user_id, closed_trades = closed, "User withdrawn");
        Ok(WithdrawResponse {
            message: "Account withdrawn".to_string(),
            closed_trades: closed,
        })
    }
}
