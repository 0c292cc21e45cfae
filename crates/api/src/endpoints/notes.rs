//! Notes endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::Serialize;
use studyhub_common::AppResult;
use studyhub_core::{
    BookmarkToggle, CreateNoteInput, NoteListQuery, Paginated, UpdateNoteInput, VoteOutcome,
};
use studyhub_db::entities::{ContentType, content_vote::VoteDirection, note};

use super::{ApprovalRequest, VoteRequest};
use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// The caller's vote on a note.
#[derive(Serialize)]
pub struct MyVoteResponse {
    pub direction: Option<VoteDirection>,
}

/// List notes visible to the caller.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NoteListQuery>,
) -> AppResult<ApiResponse<Paginated<note::Model>>> {
    let page = state.note_service.list(viewer.as_ref(), &query).await?;
    Ok(ApiResponse::ok(page))
}

/// Create a note.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateNoteInput>,
) -> AppResult<ApiResponse<note::Model>> {
    let note = state.note_service.create(&user, input).await?;
    Ok(ApiResponse::created(note))
}

/// Get a note.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<note::Model>> {
    let note = state.note_service.get(viewer.as_ref(), &id).await?;
    Ok(ApiResponse::ok(note))
}

/// Update a note.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateNoteInput>,
) -> AppResult<ApiResponse<note::Model>> {
    let note = state.note_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(note))
}

/// Delete a note with its comments, votes, bookmarks and reports.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.note_service.delete(&user, &id).await?;
    Ok(ApiResponse::done("Note deleted"))
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
        .vote(&user, ContentType::Note, &id, req.direction)
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
        .my_vote(&user, ContentType::Note, &id)
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
        .toggle(&user, ContentType::Note, &id)
        .await?;
    Ok(ApiResponse::ok(toggle))
}

/// Whether the caller bookmarked the note.
async fn bookmark_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BookmarkToggle>> {
    let bookmarked = state
        .bookmark_service
        .is_bookmarked(&user, ContentType::Note, &id)
        .await?;
    Ok(ApiResponse::ok(BookmarkToggle { bookmarked }))
}

/// Approve or unapprove a note.
async fn set_approval(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ApprovalRequest>,
) -> AppResult<ApiResponse<note::Model>> {
    let note = state
        .note_service
        .set_approval(&user, &id, req.is_approved)
        .await?;
    Ok(ApiResponse::ok(note))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/vote", get(my_vote).post(vote))
        .route("/{id}/bookmark", get(bookmark_status).post(toggle_bookmark))
        .route("/{id}/approval", patch(set_approval))
}
