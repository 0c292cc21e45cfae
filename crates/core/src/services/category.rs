//! Category service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{category, user},
    repositories::CategoryRepository,
};
use validator::Validate;

use super::guard::require_moderator;

/// Input for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// Input for editing a category.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub position: Option<i32>,
}

/// Category service for business logic.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(category_repo: CategoryRepository) -> Self {
        Self {
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn ensure_name_free(&self, name: &str, except_id: Option<&str>) -> AppResult<()> {
        match self.category_repo.find_by_name(name).await? {
            Some(existing) if Some(existing.id.as_str()) != except_id => Err(AppError::Conflict(
                format!("Category already exists: {name}"),
            )),
            _ => Ok(()),
        }
    }

    /// All categories ordered by position, then name.
    pub async fn list(&self) -> AppResult<Vec<category::Model>> {
        self.category_repo.list().await
    }

    /// Create a category.
    pub async fn create(
        &self,
        moderator: &user::Model,
        input: CreateCategoryInput,
    ) -> AppResult<category::Model> {
        require_moderator(moderator)?;
        input.validate()?;

        let name = input.name.trim().to_string();
        self.ensure_name_free(&name, None).await?;

        let model = category::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name),
            description: Set(input.description),
            position: Set(input.position),
            created_at: Set(Utc::now().into()),
        };

        self.category_repo.create(model).await
    }

    /// Edit a category.
    pub async fn update(
        &self,
        moderator: &user::Model,
        id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<category::Model> {
        require_moderator(moderator)?;
        input.validate()?;

        let category = self.category_repo.get_by_id(id).await?;
        let mut active: category::ActiveModel = category.into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            self.ensure_name_free(&name, Some(id)).await?;
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }

        self.category_repo.update(active).await
    }

    /// Delete a category. Content in it becomes uncategorized.
    pub async fn delete(&self, moderator: &user::Model, id: &str) -> AppResult<()> {
        require_moderator(moderator)?;
        self.category_repo.get_by_id(id).await?;
        self.category_repo.delete(id).await
    }
}
