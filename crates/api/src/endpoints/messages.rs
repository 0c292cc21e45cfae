//! Group chat endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use studyhub_common::AppResult;
use studyhub_core::{EditMessageInput, MessageWindow, SendMessageInput};
use studyhub_db::entities::group_message;

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Message history in ascending order.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ApiQuery(window): ApiQuery<MessageWindow>,
) -> AppResult<ApiResponse<Vec<group_message::Model>>> {
    let messages = state
        .chat_service
        .list(&user.id, &group_id, &window)
        .await?;
    Ok(ApiResponse::ok(messages))
}

/// Send a message.
async fn send(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ApiJson(input): ApiJson<SendMessageInput>,
) -> AppResult<ApiResponse<group_message::Model>> {
    let message = state.chat_service.send(&user.id, &group_id, input).await?;
    Ok(ApiResponse::created(message))
}

/// Edit one of the caller's messages.
async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((group_id, message_id)): Path<(String, String)>,
    ApiJson(input): ApiJson<EditMessageInput>,
) -> AppResult<ApiResponse<group_message::Model>> {
    let message = state
        .chat_service
        .edit(&user.id, &group_id, &message_id, input)
        .await?;
    Ok(ApiResponse::ok(message))
}

/// Delete a message.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((group_id, message_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .chat_service
        .delete(&user.id, &group_id, &message_id)
        .await?;
    Ok(ApiResponse::done("Message deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/messages", get(list).post(send))
        .route("/{id}/messages/{message_id}", patch(edit).delete(delete))
}
