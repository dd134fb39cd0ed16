//! Group routes: create, join, list, rename, dissolve.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use domain::models::group::{
    CreateGroupRequest, CreateGroupResponse, DissolveGroupResponse, JoinGroupRequest,
    JoinGroupResponse, ListGroupsResponse, UpdateGroupRequest,
};
use domain::models::Group;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentUser, JsonBody, PathParams};

/// Create a group. The caller becomes its ADMIN.
///
/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateGroupRequest>,
) -> Result<(StatusCode, Json<CreateGroupResponse>), ApiError> {
    let response = state.groups.create(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Join a group by invitation code.
///
/// POST /api/groups/join
pub async fn join_group(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<JoinGroupRequest>,
) -> Result<Json<JoinGroupResponse>, ApiError> {
    Ok(Json(state.groups.join(user.user_id, request).await?))
}

/// Groups the caller belongs to.
///
/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ListGroupsResponse>, ApiError> {
    Ok(Json(state.groups.list_mine(user.user_id).await?))
}

/// PUT /api/groups/:group_id
pub async fn rename_group(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(group_id): PathParams<Uuid>,
    JsonBody(request): JsonBody<UpdateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(
        state.groups.rename(user.user_id, group_id, request).await?,
    ))
}

/// Dissolve a group and close its OPEN trades.
///
/// DELETE /api/groups/:group_id
pub async fn dissolve_group(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(group_id): PathParams<Uuid>,
) -> Result<Json<DissolveGroupResponse>, ApiError> {
    let closed_trades = state.groups.dissolve(user.user_id, group_id).await?;
    Ok(Json(DissolveGroupResponse {
        message: "Group dissolved".to_string(),
        closed_trades,
    }))
}
