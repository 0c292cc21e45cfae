//! File upload repository.

use std::sync::Arc;

use crate::entities::{FileUpload, file_upload};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use studyhub_common::{AppError, AppResult};

/// File upload repository for database operations.
#[derive(Clone)]
pub struct FileUploadRepository {
    db: Arc<DatabaseConnection>,
}

impl FileUploadRepository {
    /// Create a new file upload repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<file_upload::Model>> {
        FileUpload::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new file record.
    pub async fn create(&self, model: file_upload::ActiveModel) -> AppResult<file_upload::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a file record.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        FileUpload::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List a user's files, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<file_upload::Model>> {
        let mut query = FileUpload::find()
            .filter(file_upload::Column::UserId.eq(user_id))
            .order_by_desc(file_upload::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(file_upload::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
