//! Note service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{ContentType, note, user},
    repositories::{CategoryRepository, ContentQuery, NoteRepository},
};
use validator::Validate;

use super::{
    PageParams, Paginated,
    content::ContentStore,
    guard::{ensure_owner_or_moderator, require_moderator},
    normalize_tags,
    visibility::visibility_for,
};

/// Input for creating a note.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 50000))]
    pub content: String,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub tags: Vec<String>,

    pub category_id: Option<String>,
}

/// Input for editing a note. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50000))]
    pub content: Option<String>,

    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,

    pub category_id: Option<String>,
}

/// Listing filters for notes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteListQuery {
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub tag: Option<String>,
    /// Text search over title and content.
    pub q: Option<String>,
    #[serde(default)]
    pub include_unapproved: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl NoteListQuery {
    /// Pagination part of the query.
    #[must_use]
    pub const fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Repository filter for this query.
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

/// Note service for business logic.
#[derive(Clone)]
pub struct NoteService {
    note_repo: NoteRepository,
    category_repo: CategoryRepository,
    content: ContentStore,
    id_gen: IdGenerator,
}

impl NoteService {
    /// Create a new note service.
    #[must_use]
    pub const fn new(
        note_repo: NoteRepository,
        category_repo: CategoryRepository,
        content: ContentStore,
    ) -> Self {
        Self {
            note_repo,
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

    /// Create a note. Notes by moderators are approved immediately.
    pub async fn create(&self, user: &user::Model, input: CreateNoteInput) -> AppResult<note::Model> {
        input.validate()?;
        self.check_category(input.category_id.as_deref()).await?;

        let model = note::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            category_id: Set(input.category_id),
            title: Set(input.title.trim().to_string()),
            content: Set(input.content),
            tags: Set(serde_json::json!(normalize_tags(&input.tags))),
            is_approved: Set(user.is_moderator()),
            upvotes: Set(0),
            downvotes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let note = self.note_repo.create(model).await?;
        tracing::debug!(note_id = %note.id, user_id = %user.id, "Created note");
        Ok(note)
    }

    /// Fetch a note the caller may see.
    pub async fn get(&self, viewer: Option<&user::Model>, id: &str) -> AppResult<note::Model> {
        self.note_repo
            .find_visible(id, &visibility_for(viewer, true))
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
    }

    /// List notes matching the filters, with the total under the same visibility.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        query: &NoteListQuery,
    ) -> AppResult<Paginated<note::Model>> {
        let visibility = visibility_for(viewer, query.include_unapproved);
        let (items, total) = self
            .note_repo
            .find_page(&query.to_content_query(), &visibility)
            .await?;
        Ok(Paginated::new(items, total, &query.page()))
    }

    /// Edit a note as its author or a moderator. Approval is kept.
    pub async fn update(
        &self,
        user: &user::Model,
        id: &str,
        input: UpdateNoteInput,
    ) -> AppResult<note::Model> {
        input.validate()?;

        let found = self.note_repo.find_by_id(id).await?;
        let note = ensure_owner_or_moderator(found, user, "Note")?;
        self.check_category(input.category_id.as_deref()).await?;

        let mut active: note::ActiveModel = note.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(serde_json::json!(normalize_tags(&tags)));
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.note_repo.update(active).await
    }

    /// Delete a note with its votes, bookmarks, comments and reports.
    pub async fn delete(&self, user: &user::Model, id: &str) -> AppResult<()> {
        let found = self.note_repo.find_by_id(id).await?;
        let note = ensure_owner_or_moderator(found, user, "Note")?;
        self.content.delete(ContentType::Note, &note.id).await
    }

    /// Approve or unapprove a note.
    pub async fn set_approval(
        &self,
        moderator: &user::Model,
        id: &str,
        approved: bool,
    ) -> AppResult<note::Model> {
        require_moderator(moderator)?;
        let note = self.note_repo.get_by_id(id).await?;

        let mut active: note::ActiveModel = note.into();
        active.is_approved = Set(approved);
        let note = self.note_repo.update(active).await?;

        tracing::info!(note_id = %note.id, approved, moderator = %moderator.id, "Note approval changed");
        Ok(note)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::sync::Arc;
    use studyhub_db::entities::user::Role;

    fn service(db: sea_orm::DatabaseConnection) -> NoteService {
        let db = Arc::new(db);
        NoteService::new(
            NoteRepository::new(db.clone()),
            CategoryRepository::new(db.clone()),
            ContentStore::new(db),
        )
    }

    fn input() -> CreateNoteInput {
        CreateNoteInput {
            title: "Ownership".to_string(),
            content: "Every value has a single owner".to_string(),
            tags: vec!["Rust".to_string()],
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_by_user_starts_unapproved() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "alice", false)]])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let note = service(db).create(&alice, input()).await.unwrap();
        assert!(!note.is_approved);
    }

    #[tokio::test]
    async fn test_create_with_missing_category_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<studyhub_db::entities::category::Model>::new()])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let mut input = input();
        input.category_id = Some("nope".to_string());
        let err = service(db).create(&alice, input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_hidden_note_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();

        let err = service(db).get(None, "n1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_reports_total_with_page() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[maplit::btreemap! {
                "num_items" => Value::BigInt(Some(41)),
            }]])
            .append_query_results([[test_support::note("n1", "alice", true)]])
            .into_connection();

        let query = NoteListQuery {
            q: Some("owner".to_string()),
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        let page = service(db).list(None, &query).await.unwrap();
        assert_eq!(page.total, 41);
        assert_eq!(page.page, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "alice", true)]])
            .into_connection();
        let bob = test_support::user("bob", Role::User);

        let err = service(db)
            .update(&bob, "n1", UpdateNoteInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let bob = test_support::user("bob", Role::User);

        let err = service(db).delete(&bob, "n1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_approval_requires_moderator() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let alice = test_support::user("alice", Role::User);

        let err = service(db)
            .set_approval(&alice, "n1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_list_query_maps_to_content_query() {
        let query = NoteListQuery {
            tag: Some("rust".to_string()),
            q: Some("borrow".to_string()),
            page: Some(2),
            limit: Some(10),
            ..Default::default()
        };
        let content = query.to_content_query();
        assert_eq!(content.offset, 10);
        assert_eq!(content.limit, 10);
        assert_eq!(content.search.as_deref(), Some("borrow"));
    }
}
