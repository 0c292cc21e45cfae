//! Note repository.

use std::sync::Arc;

use crate::entities::{Note, note};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use studyhub_common::{AppError, AppResult};

use super::{ContentQuery, Visibility};

/// Note repository for database operations.
#[derive(Clone)]
pub struct NoteRepository {
    db: Arc<DatabaseConnection>,
}

impl NoteRepository {
    /// Create a new note repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn visibility(visibility: &Visibility) -> Condition {
        visibility.condition(note::Column::IsApproved, note::Column::UserId)
    }

    /// Find a note by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<note::Model>> {
        Note::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a note by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<note::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note not found: {id}")))
    }

    /// Find a note by ID if it passes the visibility predicate.
    pub async fn find_visible(
        &self,
        id: &str,
        visibility: &Visibility,
    ) -> AppResult<Option<note::Model>> {
        Note::find_by_id(id)
            .filter(Self::visibility(visibility))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of notes and the total matching the same predicate.
    pub async fn find_page(
        &self,
        query: &ContentQuery,
        visibility: &Visibility,
    ) -> AppResult<(Vec<note::Model>, u64)> {
        let select = Note::find()
            .filter(query.condition(
                note::Column::CategoryId,
                note::Column::UserId,
                note::Column::Title,
                note::Column::Content,
            ))
            .filter(Self::visibility(visibility));

        let total = select
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = select
            .order_by_desc(note::Column::CreatedAt)
            .order_by_desc(note::Column::Id)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((items, total))
    }

    /// Create a new note.
    pub async fn create(&self, model: note::ActiveModel) -> AppResult<note::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a note.
    pub async fn update(&self, model: note::ActiveModel) -> AppResult<note::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a note and lock its row until the surrounding transaction ends.
    pub async fn find_for_update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<note::Model>> {
        Note::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite the cached vote tallies.
    pub async fn set_tallies_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        upvotes: i32,
        downvotes: i32,
    ) -> AppResult<()> {
        Note::update_many()
            .col_expr(note::Column::Upvotes, Expr::value(upvotes))
            .col_expr(note::Column::Downvotes, Expr::value(downvotes))
            .filter(note::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a note.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Note::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all notes.
    pub async fn count(&self) -> AppResult<u64> {
        Note::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count notes awaiting approval.
    pub async fn count_pending(&self) -> AppResult<u64> {
        Note::find()
            .filter(note::Column::IsApproved.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count notes by author.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Note::find()
            .filter(note::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum the vote tallies over an author's notes as `(upvotes, downvotes)`.
    pub async fn sum_votes_by_user(&self, user_id: &str) -> AppResult<(i64, i64)> {
        let sums: Option<(Option<i64>, Option<i64>)> = Note::find()
            .select_only()
            .column_as(Expr::col(note::Column::Upvotes).sum(), "upvotes")
            .column_as(Expr::col(note::Column::Downvotes).sum(), "downvotes")
            .filter(note::Column::UserId.eq(user_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let (up, down) = sums.unwrap_or_default();
        Ok((up.unwrap_or(0), down.unwrap_or(0)))
    }
}
