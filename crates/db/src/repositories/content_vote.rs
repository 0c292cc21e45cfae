//! Content vote repository.
//!
//! All writes take an explicit connection: votes are only ever changed inside
//! the toggle transaction that also recomputes the content tallies.

use std::sync::Arc;

use crate::entities::{
    ContentType, ContentVote,
    content_vote::{self, VoteDirection},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use studyhub_common::{AppError, AppResult};

/// Content vote repository for database operations.
#[derive(Clone)]
pub struct ContentVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl ContentVoteRepository {
    /// Create a new content vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the caller's vote on a content item.
    pub async fn find_for_pair(
        &self,
        user_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<Option<content_vote::Model>> {
        self.find_for_pair_in(self.db.as_ref(), user_id, content_type, content_id)
            .await
    }

    /// Find the caller's vote on a content item using the given connection.
    pub async fn find_for_pair_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<Option<content_vote::Model>> {
        ContentVote::find()
            .filter(content_vote::Column::UserId.eq(user_id))
            .filter(content_vote::Column::ContentType.eq(content_type))
            .filter(content_vote::Column::ContentId.eq(content_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a vote.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: content_vote::ActiveModel,
    ) -> AppResult<content_vote::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| super::insert_error(e, "Vote already exists"))
    }

    /// Flip the direction of an existing vote.
    pub async fn set_direction_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        vote: content_vote::Model,
        direction: VoteDirection,
    ) -> AppResult<content_vote::Model> {
        let mut active: content_vote::ActiveModel = vote.into();
        active.direction = Set(direction);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a vote by ID.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        ContentVote::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count votes in one direction on a content item.
    pub async fn count_direction_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        content_type: ContentType,
        content_id: &str,
        direction: VoteDirection,
    ) -> AppResult<u64> {
        ContentVote::find()
            .filter(content_vote::Column::ContentType.eq(content_type))
            .filter(content_vote::Column::ContentId.eq(content_id))
            .filter(content_vote::Column::Direction.eq(direction))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every vote on a content item.
    pub async fn delete_for_content_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<u64> {
        let result = ContentVote::delete_many()
            .filter(content_vote::Column::ContentType.eq(content_type))
            .filter(content_vote::Column::ContentId.eq(content_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
