//! User registration, lookup and withdrawal routes.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use domain::models::user::{MeResponse, RegisterUserRequest, WithdrawResponse};
use domain::models::User;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthenticatedIdentity, CurrentUser, JsonBody, PathParams};

/// Look up a user by external identity.
///
/// GET /api/users/:external_id
///
/// Public. Withdrawn users are not found.
pub async fn get_user(
    State(state): State<AppState>,
    PathParams(external_id): PathParams<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.find_by_external_id(&external_id).await?))
}

/// Register the authenticated identity.
///
/// POST /api/users
pub async fn register_user(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    JsonBody(request): JsonBody<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .users
        .register(identity.external_id(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Internal id of the caller.
///
/// POST /api/me
pub async fn me(user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
    })
}

/// Withdraw the caller's account and close their OPEN trades.
///
/// DELETE /api/me
pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let response = state.users.withdraw(user.user_id).await?;
    info!(user_id = %user.user_id, "Account withdrawal completed");
    Ok(Json(response))
}
