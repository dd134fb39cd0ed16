//! User domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Display name written over a withdrawn account.
pub const WITHDRAWN_DISPLAY_NAME: &str = "Withdrawn user";

/// Represents a registered user.
///
/// `external_id` is the subject string issued by the identity provider.
/// Withdrawn users keep their row (historical trades point at it) but the
/// external identity is replaced by a tombstone that can never match a login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_withdrawn(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Tombstone external identity assigned on withdrawal.
pub fn tombstone_external_id(user_id: Uuid) -> String {
    format!("withdrawn:{}", user_id)
}

/// Request payload for registering the current identity.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegisterUserRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,

    #[validate(url(message = "Profile image must be a valid URL"))]
    pub profile_image_url: Option<String>,
}

/// Response for `POST /api/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MeResponse {
    pub user_id: Uuid,
}

/// Response after withdrawing from the platform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WithdrawResponse {
    pub message: String,
    pub closed_trades: u64,
}
