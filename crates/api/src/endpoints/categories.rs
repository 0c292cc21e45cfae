//! Category endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use studyhub_common::AppResult;
use studyhub_core::{CreateCategoryInput, UpdateCategoryInput};
use studyhub_db::entities::category;

use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// List categories in display order.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<category::Model>>> {
    let categories = state.category_service.list().await?;
    Ok(ApiResponse::ok(categories))
}

/// Create a category.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.create(&user, input).await?;
    Ok(ApiResponse::created(category))
}

/// Update a category.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(category))
}

/// Delete a category.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.category_service.delete(&user, &id).await?;
    Ok(ApiResponse::done("Category deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update).delete(delete))
}
