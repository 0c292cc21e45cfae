//! Study group endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::Deserialize;
use studyhub_common::{AppError, AppResult};
use studyhub_core::{AddMemberInput, CreateGroupInput, GroupDetail, PageParams, UpdateGroupInput};
use studyhub_db::entities::{group_member, study_group};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Group listing query.
#[derive(Debug, Deserialize)]
pub struct ListGroupsQuery {
    /// List the caller's groups instead of public ones.
    #[serde(default)]
    pub joined: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Public groups, or the caller's groups with `joined=true`.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListGroupsQuery>,
) -> AppResult<ApiResponse<Vec<study_group::Model>>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let groups = if query.joined {
        let user = viewer.ok_or_else(AppError::unauthenticated)?;
        state.group_service.list_joined(&user.id, &page).await?
    } else {
        state.group_service.list_public(&page).await?
    };
    Ok(ApiResponse::ok(groups))
}

/// Create a group; the caller becomes its owner.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateGroupInput>,
) -> AppResult<ApiResponse<study_group::Model>> {
    let group = state.group_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(group))
}

/// Get a group with the caller's role in it.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GroupDetail>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let detail = state.group_service.get(viewer_id, &id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Update a group.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateGroupInput>,
) -> AppResult<ApiResponse<study_group::Model>> {
    let group = state.group_service.update(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(group))
}

/// Delete a group with its members and messages.
async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.group_service.delete(&user.id, &id).await?;
    Ok(ApiResponse::done("Group deleted"))
}

/// Join a public group.
async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<group_member::Model>> {
    let member = state.group_service.join(&user.id, &id).await?;
    Ok(ApiResponse::ok(member).with_message("Joined group"))
}

/// Leave a group.
async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.group_service.leave(&user.id, &id).await?;
    Ok(ApiResponse::done("Left group"))
}

/// List members, earliest joiners first.
async fn members(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<Vec<group_member::Model>>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let members = state
        .group_service
        .list_members(viewer_id, &id, &page)
        .await?;
    Ok(ApiResponse::ok(members))
}

/// Add a user to a group.
async fn add_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AddMemberInput>,
) -> AppResult<ApiResponse<group_member::Model>> {
    let member = state.group_service.add_member(&user, &id, input).await?;
    Ok(ApiResponse::created(member))
}

/// Remove a user from a group.
async fn remove_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .group_service
        .remove_member(&user.id, &id, &user_id)
        .await?;
    Ok(ApiResponse::done("Member removed"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", post(leave))
        .route("/{id}/members", get(members).post(add_member))
        .route("/{id}/members/{user_id}", delete(remove_member))
}
