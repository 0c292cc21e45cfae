//! Notification endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use studyhub_common::AppResult;
use studyhub_db::entities::notification;

use crate::{
    extractors::{ApiQuery, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Notification listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    20
}

/// Unread count response.
#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Mark-all-read response.
#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// The caller's notifications, newest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListNotificationsQuery>,
) -> AppResult<ApiResponse<Vec<notification::Model>>> {
    let limit = query.limit.clamp(1, 100);
    let notifications = state
        .notification_service
        .list(&user.id, limit, query.until_id.as_deref(), query.unread_only)
        .await?;
    Ok(ApiResponse::ok(notifications))
}

/// Number of unread notifications.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.unread_count(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Mark one notification as read.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<notification::Model>> {
    let notification = state.notification_service.mark_read(&user.id, &id).await?;
    Ok(ApiResponse::ok(notification))
}

/// Mark every notification as read.
async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllReadResponse>> {
    let updated = state.notification_service.mark_all_read(&user.id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { updated }))
}

/// Delete a notification.
async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.delete(&user.id, &id).await?;
    Ok(ApiResponse::done("Notification deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}", delete(destroy))
        .route("/{id}/read", post(mark_read))
}
