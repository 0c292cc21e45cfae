//! Bookmark endpoints.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;
use studyhub_common::AppResult;
use studyhub_core::PageParams;
use studyhub_db::entities::{ContentType, bookmark};

use crate::{
    extractors::{ApiQuery, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Bookmark listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookmarksQuery {
    pub content_type: Option<ContentType>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// The caller's bookmarks, newest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListBookmarksQuery>,
) -> AppResult<ApiResponse<Vec<bookmark::Model>>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let bookmarks = state
        .bookmark_service
        .list(&user.id, query.content_type, &page)
        .await?;
    Ok(ApiResponse::ok(bookmarks))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}
