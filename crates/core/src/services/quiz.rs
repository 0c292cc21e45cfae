//! Quiz service.
//!
//! A quiz is an ordered list of references to existing questions. Attempts
//! are scored against each question's stored answer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{question, quiz, quiz_attempt, user},
    repositories::{QuestionRepository, QuizRepository, Visibility},
};
use validator::Validate;

use super::{PageParams, guard::ensure_owner, visibility::visibility_for};

/// Input for creating a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub category_id: Option<String>,

    #[validate(length(max = 100))]
    #[serde(default)]
    pub question_ids: Vec<String>,

    #[validate(range(min = 10, max = 86400))]
    pub time_limit_secs: Option<i32>,
}

/// Input for editing a quiz. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub category_id: Option<String>,

    #[validate(length(max = 100))]
    pub question_ids: Option<Vec<String>>,

    #[validate(range(min = 10, max = 86400))]
    pub time_limit_secs: Option<i32>,
}

/// Answers keyed by question ID.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptInput {
    pub answers: HashMap<String, String>,
}

/// A question in quiz order.
#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestionView {
    pub position: i32,
    pub question: question::Model,
}

/// A quiz with its questions.
#[derive(Debug, Clone, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: quiz::Model,
    pub questions: Vec<QuizQuestionView>,
}

/// Per-question outcome of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub correct: bool,
    pub expected: Option<String>,
}

/// A scored attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    #[serde(flatten)]
    pub attempt: quiz_attempt::Model,
    pub results: Vec<AnswerResult>,
}

/// Compare a given answer to the stored one, ignoring case and surrounding
/// whitespace. Questions without a stored answer never match.
#[must_use]
pub fn answers_match(expected: Option<&str>, given: &str) -> bool {
    expected.is_some_and(|expected| {
        let expected = expected.trim();
        !expected.is_empty() && expected.to_lowercase() == given.trim().to_lowercase()
    })
}

/// Quiz service for business logic.
#[derive(Clone)]
pub struct QuizService {
    quiz_repo: QuizRepository,
    question_repo: QuestionRepository,
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl QuizService {
    /// Create a new quiz service.
    #[must_use]
    pub const fn new(
        quiz_repo: QuizRepository,
        question_repo: QuestionRepository,
        db: Arc<DatabaseConnection>,
    ) -> Self {
        Self {
            quiz_repo,
            question_repo,
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Reject duplicate IDs and questions the author cannot see.
    async fn check_questions(&self, user: &user::Model, ids: &[String]) -> AppResult<()> {
        let unique: HashSet<&String> = ids.iter().collect();
        if unique.len() != ids.len() {
            return Err(AppError::BadRequest(
                "A question can appear in a quiz only once".to_string(),
            ));
        }

        let visibility = visibility_for(Some(user), true);
        let usable = self.question_repo.find_by_ids(ids, &visibility).await?;
        if usable.len() != ids.len() {
            return Err(AppError::BadRequest(
                "Quiz references unknown questions".to_string(),
            ));
        }
        Ok(())
    }

    /// Questions of a quiz in position order. Linked questions that fail
    /// `visibility` are left out.
    async fn ordered_questions(
        &self,
        quiz_id: &str,
        visibility: &Visibility,
    ) -> AppResult<Vec<QuizQuestionView>> {
        let links = self.quiz_repo.find_questions(quiz_id).await?;
        let ids: Vec<String> = links.iter().map(|l| l.question_id.clone()).collect();
        let mut by_id: HashMap<String, question::Model> = self
            .question_repo
            .find_by_ids(&ids, visibility)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        Ok(links
            .into_iter()
            .filter_map(|link| {
                by_id.remove(&link.question_id).map(|question| QuizQuestionView {
                    position: link.position,
                    question,
                })
            })
            .collect())
    }

    /// Create a draft quiz.
    pub async fn create(&self, user: &user::Model, input: CreateQuizInput) -> AppResult<quiz::Model> {
        input.validate()?;
        self.check_questions(user, &input.question_ids).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = quiz::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            category_id: Set(input.category_id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            time_limit_secs: Set(input.time_limit_secs),
            is_published: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let quiz = self.quiz_repo.create_in(&txn, model).await?;
        self.quiz_repo
            .replace_questions_in(&txn, &quiz.id, &input.question_ids)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(quiz)
    }

    /// Fetch a quiz with its questions. Drafts are visible to their author only,
    /// and only the author sees the stored answers. Unapproved questions are
    /// shown to the quiz author when they may see them, and to nobody else.
    pub async fn get(&self, viewer: Option<&user::Model>, id: &str) -> AppResult<QuizDetail> {
        let quiz = self
            .quiz_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let is_owner = viewer.is_some_and(|v| v.id == quiz.user_id);
        if !quiz.is_published && !is_owner {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let visibility = visibility_for(viewer, is_owner);
        let mut questions = self.ordered_questions(&quiz.id, &visibility).await?;
        if !is_owner {
            for view in &mut questions {
                view.question.answer = None;
            }
        }

        Ok(QuizDetail { quiz, questions })
    }

    /// List published quizzes, plus the caller's drafts when asked.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        include_own_drafts: bool,
        category_id: Option<&str>,
        page: &PageParams,
    ) -> AppResult<Vec<quiz::Model>> {
        self.quiz_repo
            .find_listed(
                viewer.map(|v| v.id.as_str()),
                include_own_drafts,
                category_id,
                page.limit(),
                page.offset(),
            )
            .await
    }

    /// Edit one of the caller's quizzes.
    pub async fn update(
        &self,
        user: &user::Model,
        id: &str,
        input: UpdateQuizInput,
    ) -> AppResult<quiz::Model> {
        input.validate()?;

        let found = self.quiz_repo.find_by_id(id).await?;
        let quiz = ensure_owner(found, &user.id, "Quiz")?;

        if let Some(ids) = &input.question_ids {
            if ids.is_empty() && quiz.is_published {
                return Err(AppError::BadRequest(
                    "A published quiz needs at least one question".to_string(),
                ));
            }
            self.check_questions(user, ids).await?;
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut active: quiz::ActiveModel = quiz.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(limit) = input.time_limit_secs {
            active.time_limit_secs = Set(Some(limit));
        }
        active.updated_at = Set(Some(Utc::now().into()));
        let quiz = self.quiz_repo.update_in(&txn, active).await?;

        if let Some(ids) = &input.question_ids {
            self.quiz_repo
                .replace_questions_in(&txn, &quiz.id, ids)
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(quiz)
    }

    /// Delete one of the caller's quizzes with its attempts.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let found = self.quiz_repo.find_by_id(id).await?;
        let quiz = ensure_owner(found, user_id, "Quiz")?;
        self.quiz_repo.delete(&quiz.id).await
    }

    /// Publish or unpublish one of the caller's quizzes.
    pub async fn set_published(
        &self,
        user_id: &str,
        id: &str,
        published: bool,
    ) -> AppResult<quiz::Model> {
        let found = self.quiz_repo.find_by_id(id).await?;
        let quiz = ensure_owner(found, user_id, "Quiz")?;

        if published && self.quiz_repo.find_questions(&quiz.id).await?.is_empty() {
            return Err(AppError::BadRequest(
                "Cannot publish a quiz without questions".to_string(),
            ));
        }

        let mut active: quiz::ActiveModel = quiz.into();
        active.is_published = Set(published);
        active.updated_at = Set(Some(Utc::now().into()));
        self.quiz_repo.update_in(self.db.as_ref(), active).await
    }

    /// Score and record an attempt on a published quiz.
    pub async fn submit_attempt(
        &self,
        user_id: &str,
        id: &str,
        input: SubmitAttemptInput,
    ) -> AppResult<AttemptResult> {
        let quiz = self
            .quiz_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        if !quiz.is_published {
            return Err(AppError::BadRequest(
                "Quiz is not open for attempts".to_string(),
            ));
        }

        // Only approved questions are scored
        let questions = self
            .ordered_questions(&quiz.id, &Visibility::Approved)
            .await?;
        let results: Vec<AnswerResult> = questions
            .into_iter()
            .map(|view| {
                let given = input
                    .answers
                    .get(&view.question.id)
                    .map_or("", String::as_str);
                AnswerResult {
                    correct: answers_match(view.question.answer.as_deref(), given),
                    question_id: view.question.id,
                    expected: view.question.answer,
                }
            })
            .collect();

        let score = results.iter().filter(|r| r.correct).count();
        let model = quiz_attempt::ActiveModel {
            id: Set(self.id_gen.generate()),
            quiz_id: Set(quiz.id.clone()),
            user_id: Set(user_id.to_string()),
            score: Set(i32::try_from(score).unwrap_or(i32::MAX)),
            total: Set(i32::try_from(results.len()).unwrap_or(i32::MAX)),
            answers: Set(serde_json::json!(input.answers)),
            created_at: Set(Utc::now().into()),
        };
        let attempt = self.quiz_repo.create_attempt(model).await?;

        tracing::debug!(quiz_id = %quiz.id, user_id, score, total = results.len(), "Quiz attempt scored");
        Ok(AttemptResult { attempt, results })
    }

    /// The caller's attempts, newest first.
    pub async fn list_attempts(
        &self,
        user_id: &str,
        page: &PageParams,
    ) -> AppResult<Vec<quiz_attempt::Model>> {
        self.quiz_repo
            .find_attempts_by_user(user_id, page.limit(), page.offset())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use studyhub_db::entities::{quiz_question, user::Role};

    fn create_test_quiz(id: &str, user_id: &str, is_published: bool) -> quiz::Model {
        quiz::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            category_id: None,
            title: "Geography".to_string(),
            description: None,
            time_limit_secs: None,
            is_published,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_link(question_id: &str, position: i32) -> quiz_question::Model {
        quiz_question::Model {
            id: format!("link-{question_id}"),
            quiz_id: "z1".to_string(),
            question_id: question_id.to_string(),
            position,
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> QuizService {
        let db = Arc::new(db);
        QuizService::new(
            QuizRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            db,
        )
    }

    /// SQL of the statement at `index` once the service is done with `db`.
    fn logged_sql(db: Arc<sea_orm::DatabaseConnection>, index: usize) -> String {
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        log[index].statements()[0].sql.clone()
    }

    #[test]
    fn test_answers_match_trims_and_ignores_case() {
        assert!(answers_match(Some("Paris"), "  paris "));
        assert!(!answers_match(Some("Paris"), "Lyon"));
        assert!(!answers_match(None, ""));
        assert!(!answers_match(Some("  "), ""));
    }

    #[tokio::test]
    async fn test_attempt_on_draft_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_quiz("z1", "alice", false)]])
            .into_connection();

        let err = service(db)
            .submit_attempt(
                "bob",
                "z1",
                SubmitAttemptInput {
                    answers: HashMap::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_attempt_is_scored() {
        let attempt = quiz_attempt::Model {
            id: "a1".to_string(),
            quiz_id: "z1".to_string(),
            user_id: "bob".to_string(),
            score: 1,
            total: 2,
            answers: serde_json::json!({}),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_quiz("z1", "alice", true)]])
            .append_query_results([[create_test_link("q1", 0), create_test_link("q2", 1)]])
            .append_query_results([[
                test_support::question("q2", "alice", Some("Berlin")),
                test_support::question("q1", "alice", Some("Paris")),
            ]])
            .append_query_results([[attempt]])
            .into_connection();

        let answers = HashMap::from([
            ("q1".to_string(), " PARIS".to_string()),
            ("q2".to_string(), "Munich".to_string()),
        ]);
        let result = service(db)
            .submit_attempt("bob", "z1", SubmitAttemptInput { answers })
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].question_id, "q1");
        assert!(result.results[0].correct);
        assert!(!result.results[1].correct);
    }

    #[tokio::test]
    async fn test_draft_hidden_from_others() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_quiz("z1", "alice", false)]])
            .into_connection();
        let bob = test_support::user("bob", Role::User);

        let err = service(db).get(Some(&bob), "z1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_answers_hidden_from_non_owner() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_quiz("z1", "alice", true)]])
            .append_query_results([[create_test_link("q1", 0)]])
            .append_query_results([[test_support::question("q1", "alice", Some("Paris"))]])
            .into_connection();

        let detail = service(db).get(None, "z1").await.unwrap();
        assert_eq!(detail.questions.len(), 1);
        assert_eq!(detail.questions[0].question.answer, None);
    }

    #[tokio::test]
    async fn test_anonymous_quiz_read_filters_unapproved_questions() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_quiz("z1", "alice", true)]])
                .append_query_results([[create_test_link("q1", 0)]])
                .append_query_results([Vec::<question::Model>::new()])
                .into_connection(),
        );
        let svc = QuizService::new(
            QuizRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            db.clone(),
        );

        let detail = svc.get(None, "z1").await.unwrap();
        assert!(detail.questions.is_empty());
        drop(svc);

        let sql = logged_sql(db, 2);
        assert!(sql.contains(r#""question"."is_approved" = $"#));
        assert!(!sql.contains(r#""question"."user_id" = $"#));
    }

    #[tokio::test]
    async fn test_quiz_author_sees_own_unapproved_questions() {
        let mut unapproved = test_support::question("q1", "alice", Some("Paris"));
        unapproved.is_approved = false;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_quiz("z1", "alice", true)]])
                .append_query_results([[create_test_link("q1", 0)]])
                .append_query_results([[unapproved]])
                .into_connection(),
        );
        let svc = QuizService::new(
            QuizRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            db.clone(),
        );
        let alice = test_support::user("alice", Role::User);

        let detail = svc.get(Some(&alice), "z1").await.unwrap();
        assert_eq!(detail.questions.len(), 1);
        assert_eq!(detail.questions[0].question.answer.as_deref(), Some("Paris"));
        drop(svc);

        let sql = logged_sql(db, 2);
        assert!(sql.contains(r#""question"."user_id" = $"#));
    }

    #[tokio::test]
    async fn test_attempt_scores_approved_questions_only() {
        let attempt = quiz_attempt::Model {
            id: "a1".to_string(),
            quiz_id: "z1".to_string(),
            user_id: "alice".to_string(),
            score: 1,
            total: 1,
            answers: serde_json::json!({}),
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_quiz("z1", "alice", true)]])
                .append_query_results([[create_test_link("q1", 0), create_test_link("q2", 1)]])
                .append_query_results([[test_support::question("q1", "alice", Some("Paris"))]])
                .append_query_results([[attempt]])
                .into_connection(),
        );
        let svc = QuizService::new(
            QuizRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            db.clone(),
        );

        let answers = HashMap::from([
            ("q1".to_string(), "Paris".to_string()),
            ("q2".to_string(), "Berlin".to_string()),
        ]);
        let result = svc
            .submit_attempt("alice", "z1", SubmitAttemptInput { answers })
            .await
            .unwrap();
        assert_eq!(result.results.len(), 1);
        assert!(result.results.iter().all(|r| r.question_id != "q2"));
        drop(svc);

        // Even the quiz author is scored against approved questions only
        let sql = logged_sql(db, 2);
        assert!(sql.contains(r#""question"."is_approved" = $"#));
        assert!(!sql.contains(r#""question"."user_id" = $"#));
    }

    #[tokio::test]
    async fn test_duplicate_question_ids_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let alice = test_support::user("alice", Role::User);

        let err = service(db)
            .create(
                &alice,
                CreateQuizInput {
                    title: "Geography".to_string(),
                    description: None,
                    category_id: None,
                    question_ids: vec!["q1".to_string(), "q1".to_string()],
                    time_limit_secs: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_publish_without_questions_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_quiz("z1", "alice", false)]])
            .append_query_results([Vec::<quiz_question::Model>::new()])
            .into_connection();

        let err = service(db)
            .set_published("alice", "z1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
