//! Questions endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::Serialize;
use studyhub_common::AppResult;
use studyhub_core::{
    BookmarkToggle, CreateQuestionInput, Paginated, QuestionListQuery, UpdateQuestionInput, VoteOutcome,
};
use studyhub_db::entities::{ContentType, content_vote::VoteDirection, question};

use super::{ApprovalRequest, VoteRequest};
use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// The caller's vote on a question.
#[derive(Serialize)]
pub struct MyVoteResponse {
    pub direction: Option<VoteDirection>,
}

/// List questions visible to the caller.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuestionListQuery>,
) -> AppResult<ApiResponse<Paginated<question::Model>>> {
    let page = state.question_service.list(viewer.as_ref(), &query).await?;
    Ok(ApiResponse::ok(page))
}

/// Create a question.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateQuestionInput>,
) -> AppResult<ApiResponse<question::Model>> {
    let question = state.question_service.create(&user, input).await?;
    Ok(ApiResponse::created(question))
}

/// Get a question.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<question::Model>> {
    let question = state.question_service.get(viewer.as_ref(), &id).await?;
    Ok(ApiResponse::ok(question))
}

/// Update a question.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateQuestionInput>,
) -> AppResult<ApiResponse<question::Model>> {
    let question = state.question_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(question))
}

/// Delete a question with its comments, votes, bookmarks and reports.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.question_service.delete(&user, &id).await?;
    Ok(ApiResponse::done("Question deleted"))
}

/// Cast, change or withdraw a vote.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .vote_service
        .vote(&user, ContentType::Question, &id, req.direction)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

/// The caller's current vote.
async fn my_vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MyVoteResponse>> {
    let direction = state
        .vote_service
        .my_vote(&user, ContentType::Question, &id)
        .await?;
    Ok(ApiResponse::ok(MyVoteResponse { direction }))
}

/// Toggle the caller's bookmark.
async fn toggle_bookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BookmarkToggle>> {
    let toggle = state
        .bookmark_service
        .toggle(&user, ContentType::Question, &id)
        .await?;
    Ok(ApiResponse::ok(toggle))
}

/// Whether the caller bookmarked the question.
async fn bookmark_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BookmarkToggle>> {
    let bookmarked = state
        .bookmark_service
        .is_bookmarked(&user, ContentType::Question, &id)
        .await?;
    Ok(ApiResponse::ok(BookmarkToggle { bookmarked }))
}

/// Approve or unapprove a question.
async fn set_approval(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ApprovalRequest>,
) -> AppResult<ApiResponse<question::Model>> {
    let question = state
        .question_service
        .set_approval(&user, &id, req.is_approved)
        .await?;
    Ok(ApiResponse::ok(question))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/vote", get(my_vote).post(vote))
        .route("/{id}/bookmark", get(bookmark_status).post(toggle_bookmark))
        .route("/{id}/approval", patch(set_approval))
}
