//! Quiz endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use studyhub_common::AppResult;
use studyhub_core::{
    AttemptResult, CreateQuizInput, PageParams, QuizDetail, SubmitAttemptInput, UpdateQuizInput,
};
use studyhub_db::entities::{quiz, quiz_attempt};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Quiz listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuizzesQuery {
    /// Also list the caller's unpublished quizzes.
    #[serde(default)]
    pub include_drafts: bool,
    pub category_id: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Publish toggle.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default = "default_published")]
    pub published: bool,
}

const fn default_published() -> bool {
    true
}

/// List published quizzes.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuizzesQuery>,
) -> AppResult<ApiResponse<Vec<quiz::Model>>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let quizzes = state
        .quiz_service
        .list(
            viewer.as_ref(),
            query.include_drafts,
            query.category_id.as_deref(),
            &page,
        )
        .await?;
    Ok(ApiResponse::ok(quizzes))
}

/// Create a quiz.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateQuizInput>,
) -> AppResult<ApiResponse<quiz::Model>> {
    let quiz = state.quiz_service.create(&user, input).await?;
    Ok(ApiResponse::created(quiz))
}

/// Get a quiz with its questions.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<QuizDetail>> {
    let detail = state.quiz_service.get(viewer.as_ref(), &id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Update a quiz.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateQuizInput>,
) -> AppResult<ApiResponse<quiz::Model>> {
    let quiz = state.quiz_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(quiz))
}

/// Delete a quiz.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.quiz_service.delete(&user.id, &id).await?;
    Ok(ApiResponse::done("Quiz deleted"))
}

/// Publish or unpublish a quiz.
async fn publish(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PublishRequest>,
) -> AppResult<ApiResponse<quiz::Model>> {
    let quiz = state
        .quiz_service
        .set_published(&user.id, &id, req.published)
        .await?;
    Ok(ApiResponse::ok(quiz))
}

/// Submit answers and get the score.
async fn submit_attempt(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SubmitAttemptInput>,
) -> AppResult<ApiResponse<AttemptResult>> {
    let result = state.quiz_service.submit_attempt(&user.id, &id, input).await?;
    Ok(ApiResponse::created(result))
}

/// The caller's attempts, newest first.
async fn my_attempts(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<Vec<quiz_attempt::Model>>> {
    let attempts = state.quiz_service.list_attempts(&user.id, &page).await?;
    Ok(ApiResponse::ok(attempts))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/attempts/mine", get(my_attempts))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/publish", post(publish))
        .route("/{id}/attempts", post(submit_attempt))
}
