//! Polymorphic access to notes and questions.
//!
//! Votes, bookmarks, comments and reports refer to content through a
//! `(ContentType, id)` pair. [`ContentStore`] dispatches on the discriminator
//! and owns the cascade that runs when a content item is deleted.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;
use studyhub_common::{AppError, AppResult};
use studyhub_db::{
    entities::{ContentType, ReportTarget, note, question},
    repositories::{
        BookmarkRepository, CommentRepository, ContentVoteRepository, NoteRepository,
        QuestionRepository, ReportRepository, Visibility,
    },
};

/// A loaded note or question.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentItem {
    Note(note::Model),
    Question(question::Model),
}

impl ContentItem {
    /// Discriminator of the wrapped row.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Note(_) => ContentType::Note,
            Self::Question(_) => ContentType::Question,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Note(n) => &n.id,
            Self::Question(q) => &q.id,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Note(n) => &n.user_id,
            Self::Question(q) => &q.user_id,
        }
    }

    #[must_use]
    pub const fn is_approved(&self) -> bool {
        match self {
            Self::Note(n) => n.is_approved,
            Self::Question(q) => q.is_approved,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Note(n) => &n.title,
            Self::Question(q) => &q.title,
        }
    }

    /// Whether `visibility` lets the caller see this row.
    #[must_use]
    pub fn is_visible(&self, visibility: &Visibility) -> bool {
        visibility.allows(self.is_approved(), self.owner_id())
    }
}

/// Resolves whether a report target exists and who owns it.
#[async_trait]
pub trait TargetLookup: Send + Sync {
    /// Owner of the target, or `None` when the target does not exist.
    async fn owner_of(&self, id: &str) -> AppResult<Option<String>>;
}

#[async_trait]
impl TargetLookup for NoteRepository {
    async fn owner_of(&self, id: &str) -> AppResult<Option<String>> {
        Ok(self.find_by_id(id).await?.map(|n| n.user_id))
    }
}

#[async_trait]
impl TargetLookup for QuestionRepository {
    async fn owner_of(&self, id: &str) -> AppResult<Option<String>> {
        Ok(self.find_by_id(id).await?.map(|q| q.user_id))
    }
}

#[async_trait]
impl TargetLookup for CommentRepository {
    async fn owner_of(&self, id: &str) -> AppResult<Option<String>> {
        Ok(self.find_by_id(id).await?.map(|c| c.user_id))
    }
}

/// Content access keyed by [`ContentType`].
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<DatabaseConnection>,
    notes: NoteRepository,
    questions: QuestionRepository,
    comments: CommentRepository,
    votes: ContentVoteRepository,
    bookmarks: BookmarkRepository,
    reports: ReportRepository,
}

impl ContentStore {
    /// Create a content store over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            notes: NoteRepository::new(db.clone()),
            questions: QuestionRepository::new(db.clone()),
            comments: CommentRepository::new(db.clone()),
            votes: ContentVoteRepository::new(db.clone()),
            bookmarks: BookmarkRepository::new(db.clone()),
            reports: ReportRepository::new(db.clone()),
            db,
        }
    }

    /// Connection used to open transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Existence/owner lookup for a report target.
    #[must_use]
    pub fn lookup(&self, target: ReportTarget) -> &dyn TargetLookup {
        match target {
            ReportTarget::Note => &self.notes,
            ReportTarget::Question => &self.questions,
            ReportTarget::Comment => &self.comments,
        }
    }

    /// Load a content item if the caller may see it.
    pub async fn find_visible(
        &self,
        content_type: ContentType,
        id: &str,
        visibility: &Visibility,
    ) -> AppResult<Option<ContentItem>> {
        Ok(match content_type {
            ContentType::Note => self
                .notes
                .find_visible(id, visibility)
                .await?
                .map(ContentItem::Note),
            ContentType::Question => self
                .questions
                .find_visible(id, visibility)
                .await?
                .map(ContentItem::Question),
        })
    }

    /// Like [`Self::find_visible`], but a hidden or missing item is `NotFound`.
    pub async fn get_visible(
        &self,
        content_type: ContentType,
        id: &str,
        visibility: &Visibility,
    ) -> AppResult<ContentItem> {
        self.find_visible(content_type, id, visibility)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", content_type.label())))
    }

    /// Load and row-lock a content item inside a transaction.
    pub async fn lock_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        content_type: ContentType,
        id: &str,
    ) -> AppResult<Option<ContentItem>> {
        Ok(match content_type {
            ContentType::Note => self
                .notes
                .find_for_update_in(conn, id)
                .await?
                .map(ContentItem::Note),
            ContentType::Question => self
                .questions
                .find_for_update_in(conn, id)
                .await?
                .map(ContentItem::Question),
        })
    }

    /// Store recomputed vote tallies on a content row.
    pub async fn set_tallies_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        content_type: ContentType,
        id: &str,
        upvotes: i32,
        downvotes: i32,
    ) -> AppResult<()> {
        match content_type {
            ContentType::Note => self.notes.set_tallies_in(conn, id, upvotes, downvotes).await,
            ContentType::Question => {
                self.questions
                    .set_tallies_in(conn, id, upvotes, downvotes)
                    .await
            }
        }
    }

    /// Delete a content item with its votes, bookmarks, comments and reports.
    pub async fn delete(&self, content_type: ContentType, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.votes
            .delete_for_content_in(&txn, content_type, id)
            .await?;
        self.bookmarks
            .delete_for_content_in(&txn, content_type, id)
            .await?;

        let comment_ids = self
            .comments
            .find_ids_for_content_in(&txn, content_type, id)
            .await?;
        self.reports
            .delete_for_targets_in(&txn, ReportTarget::Comment, comment_ids)
            .await?;
        self.comments
            .delete_for_content_in(&txn, content_type, id)
            .await?;

        self.reports
            .delete_for_targets_in(&txn, content_type.into(), vec![id.to_string()])
            .await?;

        match content_type {
            ContentType::Note => self.notes.delete_in(&txn, id).await?,
            ContentType::Question => self.questions.delete_in(&txn, id).await?,
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(%content_type, id, "Deleted content item");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[test]
    fn test_item_visibility() {
        let item = ContentItem::Note(test_support::note("n1", "alice", false));
        assert!(!item.is_visible(&Visibility::Approved));
        assert!(item.is_visible(&Visibility::ApprovedOrOwnedBy("alice".to_string())));
        assert!(!item.is_visible(&Visibility::ApprovedOrOwnedBy("bob".to_string())));
        assert_eq!(item.content_type(), ContentType::Note);
    }

    #[tokio::test]
    async fn test_get_visible_hidden_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<note::Model>::new()])
                .into_connection(),
        );
        let store = ContentStore::new(db);

        let err = store
            .get_visible(ContentType::Note, "n1", &Visibility::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Note not found"));
    }

    #[tokio::test]
    async fn test_lookup_dispatches_by_target() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_support::question("q1", "carol", None)]])
                .into_connection(),
        );
        let store = ContentStore::new(db);

        let owner = store
            .lookup(ReportTarget::Question)
            .owner_of("q1")
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn test_delete_cascades_in_one_transaction() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![maplit::btreemap! {
                    "id" => sea_orm::Value::String(Some(Box::new("c1".to_string()))),
                }]])
                .append_exec_results([exec(2), exec(1), exec(1), exec(1), exec(0), exec(1)])
                .into_connection(),
        );
        let store = ContentStore::new(db);

        store.delete(ContentType::Note, "n1").await.unwrap();
    }
}
