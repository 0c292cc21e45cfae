//! HTTP API layer for studyhub.
//!
//! - **Endpoints**: accounts, content, moderation, quizzes, groups and chat
//! - **Extractors**: authenticated callers and JSON bodies
//! - **Middleware**: bearer token resolution
//! - **Response**: the `{success, message, data}` envelope
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use response::ApiResponse;
