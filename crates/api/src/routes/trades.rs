//! Trade lifecycle routes.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use domain::models::trade::{CreateTradeRequest, MessageResponse, UpdateTradeDetailsRequest};
use domain::models::Trade;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentUser, JsonBody, PathParams};
use crate::middleware::metrics::record_trade_event;

/// Post a trade to a group.
///
/// POST /api/groups/:group_id/trades
pub async fn create_trade(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(group_id): PathParams<Uuid>,
    JsonBody(request): JsonBody<CreateTradeRequest>,
) -> Result<(StatusCode, Json<Trade>), ApiError> {
    let trade = state.trades.create(user.actor(), group_id, request).await?;
    record_trade_event("created");
    Ok((StatusCode::CREATED, Json(trade)))
}

/// OPEN trades of a group, newest first.
///
/// GET /api/groups/:group_id/trades
pub async fn list_trades(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(group_id): PathParams<Uuid>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    Ok(Json(state.trades.list_open(user.actor(), group_id).await?))
}

/// GET /api/groups/:group_id/trades/:trade_id
pub async fn get_trade(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((group_id, trade_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Trade>, ApiError> {
    Ok(Json(
        state.trades.get(user.actor(), group_id, trade_id).await?,
    ))
}

/// Delete the caller's own OPEN trade.
///
/// DELETE /api/groups/:group_id/trades/:trade_id
pub async fn delete_trade(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((_group_id, trade_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.trades.delete(user.actor(), trade_id).await?;
    record_trade_event("deleted");
    Ok(Json(MessageResponse::new("Trade deleted successfully")))
}

/// Claim an OPEN trade.
///
/// PUT /api/groups/:group_id/trades/:trade_id/accept
pub async fn accept_trade(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((group_id, trade_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state.trades.claim(user.actor(), group_id, trade_id).await?;
    record_trade_event("claimed");
    Ok(Json(trade))
}

/// Record that the requester paid the bounty.
///
/// PUT /api/trades/:trade_id/paid
pub async fn mark_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(trade_id): PathParams<Uuid>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state.trades.mark_paid(user.actor(), trade_id).await?;
    record_trade_event("paid");
    Ok(Json(trade))
}

/// PUT /api/groups/:group_id/trades/:trade_id/details
pub async fn update_details(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((group_id, trade_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(request): JsonBody<UpdateTradeDetailsRequest>,
) -> Result<Json<Trade>, ApiError> {
    Ok(Json(
        state
            .trades
            .update_details(user.actor(), group_id, trade_id, request)
            .await?,
    ))
}
