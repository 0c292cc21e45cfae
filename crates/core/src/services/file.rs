//! Uploaded file service.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Set;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{entities::file_upload, repositories::FileUploadRepository};

use super::{guard::ensure_owner, storage::StorageBackend};

const FALLBACK_MIME: &str = "application/octet-stream";
const MAX_NAME_LEN: usize = 100;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadInput {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

/// Reduce a client-supplied file name to a safe single path segment.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_NAME_LEN).collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// File service for business logic.
#[derive(Clone)]
pub struct FileService {
    file_repo: FileUploadRepository,
    storage: Arc<dyn StorageBackend>,
    max_file_size: i64,
    id_gen: IdGenerator,
}

impl FileService {
    /// Create a new file service.
    #[must_use]
    pub fn new(
        file_repo: FileUploadRepository,
        storage: Arc<dyn StorageBackend>,
        max_file_size: i64,
    ) -> Self {
        Self {
            file_repo,
            storage,
            max_file_size,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a file and record its metadata.
    pub async fn upload(&self, user_id: &str, input: UploadInput) -> AppResult<file_upload::Model> {
        let size = i64::try_from(input.data.len()).unwrap_or(i64::MAX);
        if size == 0 {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if size > self.max_file_size {
            return Err(AppError::BadRequest(format!(
                "File exceeds the maximum size of {} bytes",
                self.max_file_size
            )));
        }

        let id = self.id_gen.generate();
        let storage_key = format!("{id}/{}", sanitize_file_name(&input.file_name));
        self.storage.save(&storage_key, &input.data).await?;

        let mime_type = input
            .mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        let model = file_upload::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            original_name: Set(input.file_name),
            url: Set(self.storage.url(&storage_key)),
            storage_key: Set(storage_key.clone()),
            mime_type: Set(mime_type),
            size: Set(size),
            created_at: Set(Utc::now().into()),
        };

        match self.file_repo.create(model).await {
            Ok(file) => Ok(file),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    tracing::warn!(error = %cleanup, storage_key, "Failed to remove orphaned upload");
                }
                Err(e)
            }
        }
    }

    /// The caller's files, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<file_upload::Model>> {
        self.file_repo.find_by_user(user_id, limit, until_id).await
    }

    /// One of the caller's files.
    pub async fn get(&self, user_id: &str, id: &str) -> AppResult<file_upload::Model> {
        let found = self.file_repo.find_by_id(id).await?;
        ensure_owner(found, user_id, "File")
    }

    /// Delete one of the caller's files. The backing file is removed best-effort.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let found = self.file_repo.find_by_id(id).await?;
        let file = ensure_owner(found, user_id, "File")?;

        self.file_repo.delete(&file.id).await?;

        if let Err(e) = self.storage.delete(&file.storage_key).await {
            tracing::warn!(error = %e, file_id = %file.id, storage_key = %file.storage_key, "Failed to remove stored file");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::storage::NoOpStorage;
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    struct BrokenStorage;

    #[async_trait]
    impl StorageBackend for BrokenStorage {
        async fn save(&self, _key: &str, _data: &[u8]) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::Storage("disk on fire".to_string()))
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Ok(true)
        }

        fn url(&self, key: &str) -> String {
            format!("http://files/{key}")
        }
    }

    fn create_test_file(id: &str, user_id: &str) -> file_upload::Model {
        file_upload::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            original_name: "notes.pdf".to_string(),
            storage_key: format!("{id}/notes.pdf"),
            url: format!("http://files/{id}/notes.pdf"),
            mime_type: "application/pdf".to_string(),
            size: 42,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: sea_orm::DatabaseConnection, storage: Arc<dyn StorageBackend>) -> FileService {
        FileService::new(FileUploadRepository::new(Arc::new(db)), storage, 1024)
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my notes.pdf"), "my_notes.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name(&"a".repeat(300)).len(), MAX_NAME_LEN);
    }

    #[tokio::test]
    async fn test_empty_and_oversized_uploads_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service(db, Arc::new(NoOpStorage::default()));

        let empty = UploadInput {
            file_name: "a.txt".to_string(),
            mime_type: None,
            data: vec![],
        };
        assert!(matches!(
            service.upload("alice", empty).await,
            Err(AppError::BadRequest(_))
        ));

        let big = UploadInput {
            file_name: "a.txt".to_string(),
            mime_type: None,
            data: vec![0; 2048],
        };
        assert!(matches!(
            service.upload("alice", big).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_records_metadata() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_file("f1", "alice")]])
            .into_connection();
        let service = service(db, Arc::new(NoOpStorage::new("http://files")));

        let file = service
            .upload(
                "alice",
                UploadInput {
                    file_name: "notes.pdf".to_string(),
                    mime_type: Some("application/pdf".to_string()),
                    data: vec![1; 42],
                },
            )
            .await
            .unwrap();
        assert_eq!(file.size, 42);
    }

    #[tokio::test]
    async fn test_get_other_users_file_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_file("f1", "alice")]])
            .into_connection();
        let service = service(db, Arc::new(NoOpStorage::default()));

        let err = service.get("bob", "f1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete_survives_storage_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_file("f1", "alice")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = service(db, Arc::new(BrokenStorage));

        service.delete("alice", "f1").await.unwrap();
    }
}
