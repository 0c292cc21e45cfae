//! Authentication and account endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use studyhub_common::AppResult;
use studyhub_core::{
    AuthSession, ChangePasswordInput, LoginInput, RegisterInput, ResetPasswordInput,
    UpdateProfileInput,
};
use studyhub_db::entities::user;

use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Public view of an account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: user::Role,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Session response.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
        }
    }
}

/// Create an account.
async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.account_service.register(input).await?;
    Ok(ApiResponse::created(session.into()).with_message("Registered"))
}

/// Sign in.
async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.account_service.login(input).await?;
    Ok(ApiResponse::ok(session.into()).with_message("Logged in"))
}

/// Forgot-password request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Start a password reset. The answer is the same whether or not the
/// email belongs to an account.
async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .request_password_reset(&req.email)
        .await?;
    Ok(ApiResponse::done(
        "If the email is registered, a reset code has been sent",
    ))
}

/// Finish a password reset.
async fn reset_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ResetPasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.reset_password(input).await?;
    Ok(ApiResponse::done("Password has been reset"))
}

/// Get the caller's account.
async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(user.into()))
}

/// Update the caller's profile.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.account_service.update_profile(&user, input).await?;
    Ok(ApiResponse::ok(user.into()).with_message("Profile updated"))
}

/// Change the caller's password.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.change_password(&user, input).await?;
    Ok(ApiResponse::done("Password changed"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
        .route("/me", get(me).patch(update_me))
        .route("/me/password", post(change_password))
}
