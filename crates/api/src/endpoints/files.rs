//! File upload endpoints.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use studyhub_common::{AppError, AppResult};
use studyhub_core::UploadInput;
use studyhub_db::entities::file_upload;

use crate::{
    extractors::{ApiQuery, AuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Uploaded file response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: String,
}

impl From<file_upload::Model> for FileResponse {
    fn from(f: file_upload::Model) -> Self {
        Self {
            id: f.id,
            name: f.original_name,
            url: f.url,
            mime_type: f.mime_type,
            size: f.size,
            created_at: f.created_at.to_rfc3339(),
        }
    }
}

/// File listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

/// Upload a file via multipart form; the payload goes in the `file` field.
async fn upload(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<FileResponse>> {
    let mut upload: Option<UploadInput> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("file").to_string();
        let mime_type = field.content_type().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
            .to_vec();

        upload = Some(UploadInput {
            file_name,
            mime_type,
            data,
        });
    }

    let input = upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let file = state.file_service.upload(&user.id, input).await?;
    Ok(ApiResponse::created(file.into()))
}

/// The caller's files, newest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListFilesQuery>,
) -> AppResult<ApiResponse<Vec<FileResponse>>> {
    let files = state
        .file_service
        .list(&user.id, query.limit.clamp(1, 100), query.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(files.into_iter().map(Into::into).collect()))
}

/// Get one of the caller's files.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FileResponse>> {
    let file = state.file_service.get(&user.id, &id).await?;
    Ok(ApiResponse::ok(file.into()))
}

/// Delete a file record and its backing file.
async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.file_service.delete(&user.id, &id).await?;
    Ok(ApiResponse::done("File deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(upload))
        .route("/{id}", get(show).delete(destroy))
}
