//! Report endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Deserialize;
use studyhub_common::AppResult;
use studyhub_core::{CreateReportInput, PageParams, ReviewReportInput};
use studyhub_db::entities::report::{self, ReportStatus};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Moderation queue query.
#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Moderation queue, oldest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListReportsQuery>,
) -> AppResult<ApiResponse<Vec<report::Model>>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let reports = state
        .report_service
        .list(&user, query.status, &page)
        .await?;
    Ok(ApiResponse::ok(reports))
}

/// Report a note, question or comment.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateReportInput>,
) -> AppResult<ApiResponse<report::Model>> {
    let report = state.report_service.create(&user.id, input).await?;
    Ok(ApiResponse::created(report).with_message("Report submitted"))
}

/// Reports filed by the caller.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<Vec<report::Model>>> {
    let reports = state.report_service.list_mine(&user.id, &page).await?;
    Ok(ApiResponse::ok(reports))
}

/// Move a report forward.
async fn review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ReviewReportInput>,
) -> AppResult<ApiResponse<report::Model>> {
    let report = state.report_service.review(&user, &id, input).await?;
    Ok(ApiResponse::ok(report))
}

/// Withdraw a pending report.
async fn withdraw(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.report_service.withdraw(&user.id, &id).await?;
    Ok(ApiResponse::done("Report withdrawn"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/mine", get(mine))
        .route("/{id}", patch(review).delete(withdraw))
}
