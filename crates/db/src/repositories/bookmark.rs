//! Bookmark repository.

use std::sync::Arc;

use crate::entities::{Bookmark, ContentType, bookmark};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use studyhub_common::{AppError, AppResult};

use super::insert_error;

/// Bookmark repository for database operations.
#[derive(Clone)]
pub struct BookmarkRepository {
    db: Arc<DatabaseConnection>,
}

impl BookmarkRepository {
    /// Create a new bookmark repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether the user has bookmarked a content item.
    pub async fn exists(
        &self,
        user_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<bool> {
        let count = Bookmark::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::ContentType.eq(content_type))
            .filter(bookmark::Column::ContentId.eq(content_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Insert a bookmark.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: bookmark::ActiveModel,
    ) -> AppResult<bookmark::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| insert_error(e, "Already bookmarked"))
    }

    /// Delete the user's bookmark on a content item, returning rows removed.
    pub async fn delete_pair_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<u64> {
        let result = Bookmark::delete_many()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::ContentType.eq(content_type))
            .filter(bookmark::Column::ContentId.eq(content_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// List a user's bookmarks, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        content_type: Option<ContentType>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<bookmark::Model>> {
        let mut query = Bookmark::find().filter(bookmark::Column::UserId.eq(user_id));

        if let Some(content_type) = content_type {
            query = query.filter(bookmark::Column::ContentType.eq(content_type));
        }

        query
            .order_by_desc(bookmark::Column::CreatedAt)
            .order_by_desc(bookmark::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every bookmark on a content item.
    pub async fn delete_for_content_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<u64> {
        let result = Bookmark::delete_many()
            .filter(bookmark::Column::ContentType.eq(content_type))
            .filter(bookmark::Column::ContentId.eq(content_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
