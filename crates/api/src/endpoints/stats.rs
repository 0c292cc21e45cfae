//! Statistics endpoints.

use axum::{Router, extract::State, routing::get};
use studyhub_common::AppResult;
use studyhub_core::{PlatformStats, UserStats};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The caller's study statistics.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserStats>> {
    let stats = state.stats_service.user_stats(&user.id).await?;
    Ok(ApiResponse::ok(stats))
}

/// Platform-wide counters.
async fn platform(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PlatformStats>> {
    let stats = state.stats_service.platform_stats(&user).await?;
    Ok(ApiResponse::ok(stats))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/platform", get(platform))
}
