//! Bookmark service.

use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use serde::Serialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{ContentType, bookmark, user},
    repositories::BookmarkRepository,
};

use super::{PageParams, content::ContentStore, visibility::visibility_for};

/// Bookmark state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
}

/// Bookmark service for business logic.
#[derive(Clone)]
pub struct BookmarkService {
    content: ContentStore,
    bookmark_repo: BookmarkRepository,
    id_gen: IdGenerator,
}

impl BookmarkService {
    /// Create a new bookmark service.
    #[must_use]
    pub const fn new(content: ContentStore, bookmark_repo: BookmarkRepository) -> Self {
        Self {
            content,
            bookmark_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Bookmark a content item, or remove the bookmark if one exists.
    pub async fn toggle(
        &self,
        user: &user::Model,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<BookmarkToggle> {
        let visibility = visibility_for(Some(user), true);
        self.content
            .get_visible(content_type, content_id, &visibility)
            .await?;

        let txn = self
            .content
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = self
            .bookmark_repo
            .delete_pair_in(&txn, &user.id, content_type, content_id)
            .await?;

        if removed == 0 {
            let model = bookmark::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                content_type: Set(content_type),
                content_id: Set(content_id.to_string()),
                created_at: Set(Utc::now().into()),
            };
            self.bookmark_repo.create_in(&txn, model).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(BookmarkToggle {
            bookmarked: removed == 0,
        })
    }

    /// Whether the caller has bookmarked a content item they can see.
    pub async fn is_bookmarked(
        &self,
        user: &user::Model,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<bool> {
        self.content
            .get_visible(content_type, content_id, &visibility_for(Some(user), true))
            .await?;

        self.bookmark_repo
            .exists(&user.id, content_type, content_id)
            .await
    }

    /// The caller's bookmarks, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        content_type: Option<ContentType>,
        page: &PageParams,
    ) -> AppResult<Vec<bookmark::Model>> {
        self.bookmark_repo
            .find_by_user(user_id, content_type, page.limit(), page.offset())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use studyhub_db::entities::{note, user::Role};

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn create_test_bookmark() -> bookmark::Model {
        bookmark::Model {
            id: "b1".to_string(),
            user_id: "alice".to_string(),
            content_type: ContentType::Note,
            content_id: "n1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> BookmarkService {
        let db = Arc::new(db);
        BookmarkService::new(ContentStore::new(db.clone()), BookmarkRepository::new(db))
    }

    #[tokio::test]
    async fn test_toggle_twice_returns_to_original_state() {
        let note = test_support::note("n1", "bob", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[note.clone()]])
            .append_query_results([[create_test_bookmark()]])
            .append_query_results([[note]])
            .append_exec_results([exec(0), exec(1)])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let first = service
            .toggle(&alice, ContentType::Note, "n1")
            .await
            .unwrap();
        assert!(first.bookmarked);

        let second = service
            .toggle(&alice, ContentType::Note, "n1")
            .await
            .unwrap();
        assert!(!second.bookmarked);
    }

    #[tokio::test]
    async fn test_toggle_missing_content_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let err = service
            .toggle(&alice, ContentType::Note, "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bookmark_status_of_visible_note() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", true)]])
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(1)),
            }]])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let bookmarked = service(db)
            .is_bookmarked(&alice, ContentType::Note, "n1")
            .await
            .unwrap();
        assert!(bookmarked);
    }

    #[tokio::test]
    async fn test_bookmark_status_of_missing_note_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let err = service(db)
            .is_bookmarked(&alice, ContentType::Note, "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
