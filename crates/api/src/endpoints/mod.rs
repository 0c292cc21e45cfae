//! API endpoints.

mod admin;
mod auth;
mod bookmarks;
mod categories;
mod comments;
mod files;
mod groups;
mod messages;
mod notes;
mod notifications;
mod questions;
mod quizzes;
mod reports;
mod stats;

use axum::Router;
use serde::Deserialize;
use studyhub_db::entities::content_vote::VoteDirection;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/categories", categories::router())
        .nest("/notes", notes::router())
        .nest("/questions", questions::router())
        .nest("/comments", comments::router())
        .nest("/bookmarks", bookmarks::router())
        .nest("/reports", reports::router())
        .nest("/quizzes", quizzes::router())
        .nest("/groups", groups::router().merge(messages::router()))
        .nest("/notifications", notifications::router())
        .nest("/files", files::router())
        .nest("/stats", stats::router())
}

/// Body of a vote request on a note or question.
#[derive(Debug, Deserialize)]
pub(crate) struct VoteRequest {
    pub(crate) direction: VoteDirection,
}

/// Body of a moderation approval request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApprovalRequest {
    pub(crate) is_approved: bool,
}
