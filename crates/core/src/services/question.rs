//! Question service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{ContentType, question, question::Difficulty, user},
    repositories::{CategoryRepository, ContentQuery, QuestionRepository},
};
use validator::Validate;

use super::{
    PageParams, Paginated,
    content::ContentStore,
    guard::{ensure_owner_or_moderator, require_moderator},
    normalize_tags,
    visibility::visibility_for,
};

/// Input for creating a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 20000))]
    pub content: String,

    #[validate(length(max = 5000))]
    pub answer: Option<String>,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub tags: Vec<String>,

    pub category_id: Option<String>,
}

/// Input for editing a question. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 20000))]
    pub content: Option<String>,

    #[validate(length(max = 5000))]
    pub answer: Option<String>,

    pub difficulty: Option<Difficulty>,

    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,

    pub category_id: Option<String>,
}

/// Listing filters for questions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListQuery {
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub tag: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Text search over title and content.
    pub q: Option<String>,
    #[serde(default)]
    pub include_unapproved: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl QuestionListQuery {
    #[must_use]
    pub const fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    #[must_use]
    pub fn to_content_query(&self) -> ContentQuery {
        let page = self.page();
        ContentQuery {
            category_id: self.category_id.clone(),
            author_id: self.author_id.clone(),
            tag: self.tag.clone(),
            search: self.q.clone(),
            offset: page.offset(),
            limit: page.limit(),
        }
    }
}

/// Question service for business logic.
#[derive(Clone)]
pub struct QuestionService {
    question_repo: QuestionRepository,
    category_repo: CategoryRepository,
    content: ContentStore,
    id_gen: IdGenerator,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub const fn new(
        question_repo: QuestionRepository,
        category_repo: CategoryRepository,
        content: ContentStore,
    ) -> Self {
        Self {
            question_repo,
            category_repo,
            content,
            id_gen: IdGenerator::new(),
        }
    }

    async fn check_category(&self, category_id: Option<&str>) -> AppResult<()> {
        if let Some(id) = category_id {
            self.category_repo.get_by_id(id).await?;
        }
        Ok(())
    }

    /// Create a question. Questions by moderators are approved immediately.
    pub async fn create(
        &self,
        user: &user::Model,
        input: CreateQuestionInput,
    ) -> AppResult<question::Model> {
        input.validate()?;
        self.check_category(input.category_id.as_deref()).await?;

        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            category_id: Set(input.category_id),
            title: Set(input.title.trim().to_string()),
            content: Set(input.content),
            answer: Set(input.answer),
            difficulty: Set(input.difficulty),
            tags: Set(serde_json::json!(normalize_tags(&input.tags))),
            is_approved: Set(user.is_moderator()),
            upvotes: Set(0),
            downvotes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.question_repo.create(model).await
    }

    /// Fetch a question the caller may see.
    pub async fn get(
        &self,
        viewer: Option<&user::Model>,
        id: &str,
    ) -> AppResult<question::Model> {
        self.question_repo
            .find_visible(id, &visibility_for(viewer, true))
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }

    /// List questions matching the filters.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        query: &QuestionListQuery,
    ) -> AppResult<Paginated<question::Model>> {
        let visibility = visibility_for(viewer, query.include_unapproved);
        let (items, total) = self
            .question_repo
            .find_page(&query.to_content_query(), query.difficulty, &visibility)
            .await?;
        Ok(Paginated::new(items, total, &query.page()))
    }

    /// Edit a question as its author or a moderator.
    pub async fn update(
        &self,
        user: &user::Model,
        id: &str,
        input: UpdateQuestionInput,
    ) -> AppResult<question::Model> {
        input.validate()?;

        let found = self.question_repo.find_by_id(id).await?;
        let question = ensure_owner_or_moderator(found, user, "Question")?;
        self.check_category(input.category_id.as_deref()).await?;

        let mut active: question::ActiveModel = question.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(answer) = input.answer {
            active.answer = Set(Some(answer));
        }
        if let Some(difficulty) = input.difficulty {
            active.difficulty = Set(difficulty);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(serde_json::json!(normalize_tags(&tags)));
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.question_repo.update(active).await
    }

    /// Delete a question with its votes, bookmarks, comments and reports.
    pub async fn delete(&self, user: &user::Model, id: &str) -> AppResult<()> {
        let found = self.question_repo.find_by_id(id).await?;
        let question = ensure_owner_or_moderator(found, user, "Question")?;
        self.content
            .delete(ContentType::Question, &question.id)
            .await
    }

    /// Approve or unapprove a question.
    pub async fn set_approval(
        &self,
        moderator: &user::Model,
        id: &str,
        approved: bool,
    ) -> AppResult<question::Model> {
        require_moderator(moderator)?;
        let question = self.question_repo.get_by_id(id).await?;

        let mut active: question::ActiveModel = question.into();
        active.is_approved = Set(approved);
        self.question_repo.update(active).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use studyhub_db::entities::user::Role;

    fn service(db: sea_orm::DatabaseConnection) -> QuestionService {
        let db = Arc::new(db);
        QuestionService::new(
            QuestionRepository::new(db.clone()),
            CategoryRepository::new(db.clone()),
            ContentStore::new(db),
        )
    }

    #[tokio::test]
    async fn test_moderator_question_is_approved() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::question("q1", "mod", Some("Paris"))]])
            .into_connection();
        let moderator = test_support::user("mod", Role::Moderator);

        let question = service(db)
            .create(
                &moderator,
                CreateQuestionInput {
                    title: "Capital of France".to_string(),
                    content: "Name the capital of France".to_string(),
                    answer: Some("Paris".to_string()),
                    difficulty: Difficulty::Easy,
                    tags: vec![],
                    category_id: None,
                },
            )
            .await
            .unwrap();
        assert!(question.is_approved);
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::question("q1", "alice", None)]])
            .into_connection();
        let bob = test_support::user("bob", Role::User);

        let err = service(db).delete(&bob, "q1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_owner_delete_runs_cascade() {
        let exec = |rows| MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::question("q1", "alice", None)]])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
            .append_exec_results([exec(0), exec(0), exec(0), exec(0), exec(1)])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        service(db).delete(&alice, "q1").await.unwrap();
    }
}
