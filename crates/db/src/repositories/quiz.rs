//! Quiz repository (quizzes, their ordered questions, and attempts).

use std::sync::Arc;

use crate::entities::{Quiz, QuizAttempt, QuizQuestion, quiz, quiz_attempt, quiz_question};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use studyhub_common::{AppError, AppResult, IdGenerator};

/// Aggregated attempt figures for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromQueryResult)]
pub struct AttemptSummary {
    /// Number of attempts.
    pub attempts: i64,
    /// Sum of correct answers over all attempts.
    pub total_score: Option<i64>,
    /// Sum of questions over all attempts.
    pub total_questions: Option<i64>,
}

/// Quiz repository for database operations.
#[derive(Clone)]
pub struct QuizRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl QuizRepository {
    /// Create a new quiz repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Find a quiz by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<quiz::Model>> {
        Quiz::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a quiz by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<quiz::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz not found: {id}")))
    }

    /// Insert a quiz.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: quiz::ActiveModel,
    ) -> AppResult<quiz::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a quiz.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: quiz::ActiveModel,
    ) -> AppResult<quiz::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a quiz. Its questions and attempts go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Quiz::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List published quizzes, plus the viewer's own drafts when asked.
    pub async fn find_listed(
        &self,
        viewer_id: Option<&str>,
        include_own_drafts: bool,
        category_id: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<quiz::Model>> {
        let mut visible = Condition::any().add(quiz::Column::IsPublished.eq(true));
        if let (Some(viewer_id), true) = (viewer_id, include_own_drafts) {
            visible = visible.add(quiz::Column::UserId.eq(viewer_id));
        }

        let mut query = Quiz::find().filter(visible);
        if let Some(category_id) = category_id {
            query = query.filter(quiz::Column::CategoryId.eq(category_id));
        }

        query
            .order_by_desc(quiz::Column::CreatedAt)
            .order_by_desc(quiz::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ordered question links of a quiz.
    pub async fn find_questions(&self, quiz_id: &str) -> AppResult<Vec<quiz_question::Model>> {
        QuizQuestion::find()
            .filter(quiz_question::Column::QuizId.eq(quiz_id))
            .order_by_asc(quiz_question::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the question list of a quiz; positions follow slice order.
    pub async fn replace_questions_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        quiz_id: &str,
        question_ids: &[String],
    ) -> AppResult<()> {
        QuizQuestion::delete_many()
            .filter(quiz_question::Column::QuizId.eq(quiz_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if question_ids.is_empty() {
            return Ok(());
        }

        let links = question_ids
            .iter()
            .enumerate()
            .map(|(position, question_id)| quiz_question::ActiveModel {
                id: Set(self.id_gen.generate()),
                quiz_id: Set(quiz_id.to_string()),
                question_id: Set(question_id.clone()),
                position: Set(position as i32),
            });

        QuizQuestion::insert_many(links)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Record an attempt.
    pub async fn create_attempt(
        &self,
        model: quiz_attempt::ActiveModel,
    ) -> AppResult<quiz_attempt::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's attempts, newest first.
    pub async fn find_attempts_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<quiz_attempt::Model>> {
        QuizAttempt::find()
            .filter(quiz_attempt::Column::UserId.eq(user_id))
            .order_by_desc(quiz_attempt::Column::CreatedAt)
            .order_by_desc(quiz_attempt::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Attempt count and score sums for a user.
    pub async fn attempt_summary(&self, user_id: &str) -> AppResult<AttemptSummary> {
        let summary = QuizAttempt::find()
            .select_only()
            .column_as(Expr::col(quiz_attempt::Column::Id).count(), "attempts")
            .column_as(Expr::col(quiz_attempt::Column::Score).sum(), "total_score")
            .column_as(Expr::col(quiz_attempt::Column::Total).sum(), "total_questions")
            .filter(quiz_attempt::Column::UserId.eq(user_id))
            .into_model::<AttemptSummary>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(summary.unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    #[tokio::test]
    async fn test_replace_questions() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                ])
                .into_connection(),
        );

        let repo = QuizRepository::new(db.clone());
        repo.replace_questions_in(db.as_ref(), "quiz1", &["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();
        drop(repo);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_attempt_summary() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "attempts" => Value::BigInt(Some(2)),
                    "total_score" => Value::BigInt(Some(7)),
                    "total_questions" => Value::BigInt(Some(10)),
                }]])
                .into_connection(),
        );

        let repo = QuizRepository::new(db);
        let summary = repo.attempt_summary("u1").await.unwrap();

        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.total_score, Some(7));
        assert_eq!(summary.total_questions, Some(10));
    }
}
