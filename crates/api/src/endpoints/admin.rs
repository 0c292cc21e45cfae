//! Administration endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::patch,
};
use serde::Deserialize;
use studyhub_common::AppResult;
use studyhub_db::entities::user::Role;

use super::auth::UserResponse;
use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Role change request.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Change a user's role.
async fn set_role(
    AuthUser(admin): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .account_service
        .set_role(&admin, &user_id, req.role)
        .await?;
    Ok(ApiResponse::ok(user.into()).with_message("Role updated"))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/role", patch(set_role))
}
