//! Comment endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Deserialize;
use studyhub_common::AppResult;
use studyhub_core::{CreateCommentInput, PageParams, UpdateCommentInput};
use studyhub_db::entities::{ContentType, comment};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Comment listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    pub content_type: ContentType,
    pub content_id: String,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// List comments on a note or question, oldest first.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListCommentsQuery>,
) -> AppResult<ApiResponse<Vec<comment::Model>>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let comments = state
        .comment_service
        .list(viewer.as_ref(), query.content_type, &query.content_id, &page)
        .await?;
    Ok(ApiResponse::ok(comments))
}

/// Comment on a note or question.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state.comment_service.create(&user, input).await?;
    Ok(ApiResponse::created(comment))
}

/// Edit a comment.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state.comment_service.update(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(comment))
}

/// Delete a comment.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&user, &id).await?;
    Ok(ApiResponse::done("Comment deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update).delete(delete))
}
