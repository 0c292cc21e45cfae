//! Voting on notes and questions.
//!
//! A user holds at most one vote per content item. Repeating the same
//! direction withdraws the vote, the opposite direction flips it. The stored
//! tallies on the content row are recomputed from the vote rows inside the
//! same transaction that changed them.

use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use serde::Serialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{
        ContentType,
        content_vote::{self, VoteDirection},
        notification::NotificationKind,
        user,
    },
    repositories::ContentVoteRepository,
};

use super::{
    content::ContentStore,
    notification::{NewNotification, NotificationService},
    visibility::visibility_for,
};

/// What a vote request did to the caller's vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
    Changed,
}

/// Decide how a vote request changes the existing vote, if any.
#[must_use]
pub fn resolve(existing: Option<VoteDirection>, requested: VoteDirection) -> VoteAction {
    match existing {
        None => VoteAction::Added,
        Some(current) if current == requested => VoteAction::Removed,
        Some(_) => VoteAction::Changed,
    }
}

/// Result of a vote request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub action: VoteAction,
    /// The caller's vote after the request, `None` once withdrawn.
    pub direction: Option<VoteDirection>,
    pub upvotes: i32,
    pub downvotes: i32,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    content: ContentStore,
    vote_repo: ContentVoteRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        content: ContentStore,
        vote_repo: ContentVoteRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            content,
            vote_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply a vote request from `voter` to a content item.
    pub async fn vote(
        &self,
        voter: &user::Model,
        content_type: ContentType,
        content_id: &str,
        direction: VoteDirection,
    ) -> AppResult<VoteOutcome> {
        let visibility = visibility_for(Some(voter), true);

        let txn = self
            .content
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let item = self
            .content
            .lock_in(&txn, content_type, content_id)
            .await?
            .filter(|item| item.is_visible(&visibility))
            .ok_or_else(|| AppError::NotFound(format!("{} not found", content_type.label())))?;

        let existing = self
            .vote_repo
            .find_for_pair_in(&txn, &voter.id, content_type, content_id)
            .await?;

        let action = resolve(existing.as_ref().map(|v| v.direction), direction);
        match (action, existing) {
            (VoteAction::Removed, Some(vote)) => {
                self.vote_repo.delete_in(&txn, &vote.id).await?;
            }
            (VoteAction::Changed, Some(vote)) => {
                self.vote_repo
                    .set_direction_in(&txn, vote, direction)
                    .await?;
            }
            _ => {
                let model = content_vote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(voter.id.clone()),
                    content_type: Set(content_type),
                    content_id: Set(content_id.to_string()),
                    direction: Set(direction),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                };
                self.vote_repo.create_in(&txn, model).await?;
            }
        }

        let upvotes = self
            .vote_repo
            .count_direction_in(&txn, content_type, content_id, VoteDirection::Up)
            .await?;
        let downvotes = self
            .vote_repo
            .count_direction_in(&txn, content_type, content_id, VoteDirection::Down)
            .await?;
        let upvotes = i32::try_from(upvotes).unwrap_or(i32::MAX);
        let downvotes = i32::try_from(downvotes).unwrap_or(i32::MAX);

        self.content
            .set_tallies_in(&txn, content_type, content_id, upvotes, downvotes)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            user_id = %voter.id,
            %content_type,
            content_id,
            ?action,
            "Vote applied"
        );

        let direction = (action != VoteAction::Removed).then_some(direction);
        if direction == Some(VoteDirection::Up) {
            self.notifications
                .notify_quietly(NewNotification::about(
                    item.owner_id(),
                    &voter.id,
                    NotificationKind::Vote,
                    content_type.as_str(),
                    content_id,
                    format!("{} upvoted \"{}\"", voter.name, item.title()),
                ))
                .await;
        }

        Ok(VoteOutcome {
            action,
            direction,
            upvotes,
            downvotes,
        })
    }

    /// The caller's current vote on a content item they can see.
    pub async fn my_vote(
        &self,
        user: &user::Model,
        content_type: ContentType,
        content_id: &str,
    ) -> AppResult<Option<VoteDirection>> {
        self.content
            .get_visible(content_type, content_id, &visibility_for(Some(user), true))
            .await?;

        Ok(self
            .vote_repo
            .find_for_pair(&user.id, content_type, content_id)
            .await?
            .map(|v| v.direction))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use studyhub_db::{
        entities::{note, notification, user::Role},
        repositories::NotificationRepository,
    };

    fn count(n: i64) -> Vec<BTreeMap<&'static str, Value>> {
        vec![maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }]
    }

    fn exec() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn create_test_vote(id: &str, direction: VoteDirection) -> content_vote::Model {
        content_vote::Model {
            id: id.to_string(),
            user_id: "alice".to_string(),
            content_type: ContentType::Note,
            content_id: "n1".to_string(),
            direction,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_notification() -> notification::Model {
        notification::Model {
            id: "notif1".to_string(),
            user_id: "bob".to_string(),
            actor_id: Some("alice".to_string()),
            kind: NotificationKind::Vote,
            subject_type: Some("note".to_string()),
            subject_id: Some("n1".to_string()),
            message: "alice upvoted".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> VoteService {
        let db = Arc::new(db);
        VoteService::new(
            ContentStore::new(db.clone()),
            ContentVoteRepository::new(db.clone()),
            NotificationService::new(NotificationRepository::new(db)),
        )
    }

    #[test]
    fn test_resolve_branches() {
        assert_eq!(resolve(None, VoteDirection::Up), VoteAction::Added);
        assert_eq!(
            resolve(Some(VoteDirection::Up), VoteDirection::Up),
            VoteAction::Removed
        );
        assert_eq!(
            resolve(Some(VoteDirection::Up), VoteDirection::Down),
            VoteAction::Changed
        );
    }

    #[tokio::test]
    async fn test_upvote_withdraw_then_downvote() {
        let note = test_support::note("n1", "bob", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // first request: add an up vote
            .append_query_results([[note.clone()]])
            .append_query_results([Vec::<content_vote::Model>::new()])
            .append_query_results([[create_test_vote("v1", VoteDirection::Up)]])
            .append_query_results([count(1), count(0)])
            .append_query_results([[create_test_notification()]])
            // second request: same direction withdraws
            .append_query_results([[note.clone()]])
            .append_query_results([[create_test_vote("v1", VoteDirection::Up)]])
            .append_query_results([count(0), count(0)])
            // third request: down vote creates a fresh row
            .append_query_results([[note]])
            .append_query_results([Vec::<content_vote::Model>::new()])
            .append_query_results([[create_test_vote("v2", VoteDirection::Down)]])
            .append_query_results([count(0), count(1)])
            .append_exec_results([exec(), exec(), exec(), exec()])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let first = service
            .vote(&alice, ContentType::Note, "n1", VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(first.action, VoteAction::Added);
        assert_eq!((first.upvotes, first.downvotes), (1, 0));

        let second = service
            .vote(&alice, ContentType::Note, "n1", VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(second.action, VoteAction::Removed);
        assert_eq!(second.direction, None);
        assert_eq!((second.upvotes, second.downvotes), (0, 0));

        let third = service
            .vote(&alice, ContentType::Note, "n1", VoteDirection::Down)
            .await
            .unwrap();
        assert_eq!(third.action, VoteAction::Added);
        assert_eq!(third.direction, Some(VoteDirection::Down));
        assert_eq!((third.upvotes, third.downvotes), (0, 1));
    }

    #[tokio::test]
    async fn test_vote_changes_direction_in_place() {
        let mut changed = create_test_vote("v1", VoteDirection::Down);
        changed.updated_at = Some(Utc::now().into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", true)]])
            .append_query_results([
                [create_test_vote("v1", VoteDirection::Up)],
                [changed],
            ])
            .append_query_results([count(0), count(1)])
            .append_exec_results([exec()])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let outcome = service
            .vote(&alice, ContentType::Note, "n1", VoteDirection::Down)
            .await
            .unwrap();
        assert_eq!(outcome.action, VoteAction::Changed);
        assert_eq!((outcome.upvotes, outcome.downvotes), (0, 1));
    }

    #[tokio::test]
    async fn test_vote_on_missing_content_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let err = service
            .vote(&alice, ContentType::Note, "missing", VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_vote_on_hidden_content_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", false)]])
            .into_connection();
        let service = service(db);
        let alice = test_support::user("alice", Role::User);

        let err = service
            .vote(&alice, ContentType::Note, "n1", VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_my_vote_reads_current_direction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", true)]])
            .append_query_results([[create_test_vote("v1", VoteDirection::Down)]])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let direction = service(db)
            .my_vote(&alice, ContentType::Note, "n1")
            .await
            .unwrap();
        assert_eq!(direction, Some(VoteDirection::Down));
    }

    #[tokio::test]
    async fn test_my_vote_on_hidden_content_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let alice = test_support::user("alice", Role::User);

        let err = service(db)
            .my_vote(&alice, ContentType::Note, "n1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
