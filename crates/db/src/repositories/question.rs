//! Question repository.

use std::sync::Arc;

use crate::entities::{Question, question, question::Difficulty};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use studyhub_common::{AppError, AppResult};

use super::{ContentQuery, Visibility};

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn visibility(visibility: &Visibility) -> Condition {
        visibility.condition(question::Column::IsApproved, question::Column::UserId)
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {id}")))
    }

    /// Find the questions among `ids` that pass the visibility predicate.
    pub async fn find_by_ids(
        &self,
        ids: &[String],
        visibility: &Visibility,
    ) -> AppResult<Vec<question::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Question::find()
            .filter(question::Column::Id.is_in(ids.to_vec()))
            .filter(Self::visibility(visibility))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID if it passes the visibility predicate.
    pub async fn find_visible(
        &self,
        id: &str,
        visibility: &Visibility,
    ) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .filter(Self::visibility(visibility))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of questions and the total matching the same predicate.
    pub async fn find_page(
        &self,
        query: &ContentQuery,
        difficulty: Option<Difficulty>,
        visibility: &Visibility,
    ) -> AppResult<(Vec<question::Model>, u64)> {
        let mut select = Question::find()
            .filter(query.condition(
                question::Column::CategoryId,
                question::Column::UserId,
                question::Column::Title,
                question::Column::Content,
            ))
            .filter(Self::visibility(visibility));

        if let Some(difficulty) = difficulty {
            select = select.filter(question::Column::Difficulty.eq(difficulty));
        }

        let total = select
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = select
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((items, total))
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a question.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question and lock its row until the surrounding transaction ends.
    pub async fn find_for_update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
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
        Question::update_many()
            .col_expr(question::Column::Upvotes, Expr::value(upvotes))
            .col_expr(question::Column::Downvotes, Expr::value(downvotes))
            .filter(question::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a question.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Question::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all questions.
    pub async fn count(&self) -> AppResult<u64> {
        Question::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count questions awaiting approval.
    pub async fn count_pending(&self) -> AppResult<u64> {
        Question::find()
            .filter(question::Column::IsApproved.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count questions by author.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Question::find()
            .filter(question::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum the vote tallies over an author's questions as `(upvotes, downvotes)`.
    pub async fn sum_votes_by_user(&self, user_id: &str) -> AppResult<(i64, i64)> {
        let sums: Option<(Option<i64>, Option<i64>)> = Question::find()
            .select_only()
            .column_as(Expr::col(question::Column::Upvotes).sum(), "upvotes")
            .column_as(Expr::col(question::Column::Downvotes).sum(), "downvotes")
            .filter(question::Column::UserId.eq(user_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let (up, down) = sums.unwrap_or_default();
        Ok((up.unwrap_or(0), down.unwrap_or(0)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use serde_json::json;

    fn create_test_question(id: &str, difficulty: Difficulty) -> question::Model {
        question::Model {
            id: id.to_string(),
            user_id: "u1".to_string(),
            category_id: Some("cat1".to_string()),
            title: "What is a lifetime?".to_string(),
            content: "Explain lifetimes".to_string(),
            answer: Some("A region of code".to_string()),
            difficulty,
            tags: json!([]),
            is_approved: true,
            upvotes: 3,
            downvotes: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_page_by_difficulty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Value::BigInt(Some(1)),
                }]])
                .append_query_results([[create_test_question("q1", Difficulty::Hard)]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let query = ContentQuery {
            category_id: Some("cat1".to_string()),
            limit: 10,
            ..Default::default()
        };
        let (items, total) = repo
            .find_page(
                &query,
                Some(Difficulty::Hard),
                &Visibility::ApprovedOrOwnedBy("u1".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(items[0].difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn test_sum_votes_by_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "upvotes" => Value::BigInt(Some(7)),
                    "downvotes" => Value::BigInt(None),
                }]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let sums = repo.sum_votes_by_user("u1").await.unwrap();

        assert_eq!(sums, (7, 0));
    }
}
