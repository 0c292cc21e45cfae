//! Group message repository.

use std::sync::Arc;

use crate::entities::{GroupMessage, group_message};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use studyhub_common::{AppError, AppResult};

/// Window selector for chat history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MessageCursor {
    /// The most recent messages.
    #[default]
    Latest,
    /// Messages created strictly before the referenced message.
    Before(group_message::Model),
    /// Messages created strictly after the referenced message.
    After(group_message::Model),
}

/// Group message repository for database operations.
#[derive(Clone)]
pub struct GroupMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupMessageRepository {
    /// Create a new group message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group_message::Model>> {
        GroupMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new message.
    pub async fn create(
        &self,
        model: group_message::ActiveModel,
    ) -> AppResult<group_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a message.
    pub async fn update(
        &self,
        model: group_message::ActiveModel,
    ) -> AppResult<group_message::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a message.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        GroupMessage::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch a window of a group's messages in ascending creation order.
    ///
    /// Ties on `created_at` are broken by the time-ordered id.
    pub async fn find_window(
        &self,
        group_id: &str,
        cursor: &MessageCursor,
        limit: u64,
    ) -> AppResult<Vec<group_message::Model>> {
        use sea_orm::Condition;

        let query = GroupMessage::find().filter(group_message::Column::GroupId.eq(group_id));

        let mut messages = match cursor {
            MessageCursor::Latest => query
                .order_by_desc(group_message::Column::CreatedAt)
                .order_by_desc(group_message::Column::Id)
                .limit(limit)
                .all(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
            MessageCursor::Before(pivot) => query
                .filter(
                    Condition::any()
                        .add(group_message::Column::CreatedAt.lt(pivot.created_at))
                        .add(
                            Condition::all()
                                .add(group_message::Column::CreatedAt.eq(pivot.created_at))
                                .add(group_message::Column::Id.lt(pivot.id.as_str())),
                        ),
                )
                .order_by_desc(group_message::Column::CreatedAt)
                .order_by_desc(group_message::Column::Id)
                .limit(limit)
                .all(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
            MessageCursor::After(pivot) => {
                return query
                    .filter(
                        Condition::any()
                            .add(group_message::Column::CreatedAt.gt(pivot.created_at))
                            .add(
                                Condition::all()
                                    .add(group_message::Column::CreatedAt.eq(pivot.created_at))
                                    .add(group_message::Column::Id.gt(pivot.id.as_str())),
                            ),
                    )
                    .order_by_asc(group_message::Column::CreatedAt)
                    .order_by_asc(group_message::Column::Id)
                    .limit(limit)
                    .all(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()));
            }
        };

        // Newest-first windows are flipped back to chronological order
        messages.reverse();
        Ok(messages)
    }

    /// Count all messages.
    pub async fn count(&self) -> AppResult<u64> {
        GroupMessage::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_message(id: &str, minutes_ago: i64) -> group_message::Model {
        group_message::Model {
            id: id.to_string(),
            group_id: "g1".to_string(),
            sender_id: "u1".to_string(),
            content: format!("message {id}"),
            reply_to_id: None,
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).into(),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn test_latest_window_is_ascending() {
        // The store answers newest first
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_message("m3", 1),
                    create_test_message("m2", 2),
                    create_test_message("m1", 3),
                ]])
                .into_connection(),
        );

        let repo = GroupMessageRepository::new(db);
        let messages = repo
            .find_window("g1", &MessageCursor::Latest, 3)
            .await
            .unwrap();

        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_after_window_keeps_order() {
        let pivot = create_test_message("m1", 3);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_message("m2", 2), create_test_message("m3", 1)]])
                .into_connection(),
        );

        let repo = GroupMessageRepository::new(db);
        let messages = repo
            .find_window("g1", &MessageCursor::After(pivot), 10)
            .await
            .unwrap();

        assert_eq!(messages[0].id, "m2");
        assert_eq!(messages[1].id, "m3");
    }
}
