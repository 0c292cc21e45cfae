//! Group chat service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{group_member, group_message},
    repositories::{GroupMessageRepository, GroupRepository, MessageCursor},
};
use validator::Validate;

use super::{guard::ensure_owner, non_blank};

const DEFAULT_WINDOW: u64 = 50;
const MAX_WINDOW: u64 = 100;

/// Input for posting a message.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
    pub reply_to_id: Option<String>,
}

/// Input for editing a message.
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageInput {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

/// History window: the latest messages, or those before/after a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageWindow {
    pub before: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u64>,
}

/// Chat service for group messages.
#[derive(Clone)]
pub struct ChatService {
    group_repo: GroupRepository,
    message_repo: GroupMessageRepository,
    id_gen: IdGenerator,
}

impl ChatService {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(group_repo: GroupRepository, message_repo: GroupMessageRepository) -> Self {
        Self {
            group_repo,
            message_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn require_member(&self, group_id: &str, user_id: &str) -> AppResult<group_member::Model> {
        self.group_repo.get_by_id(group_id).await?;
        self.group_repo
            .get_member(group_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this group".to_string()))
    }

    /// A message of `group_id`; messages of other groups are not found.
    async fn message_in_group(
        &self,
        group_id: &str,
        message_id: &str,
    ) -> AppResult<Option<group_message::Model>> {
        Ok(self
            .message_repo
            .find_by_id(message_id)
            .await?
            .filter(|m| m.group_id == group_id))
    }

    async fn anchor(&self, group_id: &str, id: &str) -> AppResult<group_message::Model> {
        self.message_in_group(group_id, id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Unknown cursor message".to_string()))
    }

    /// Post a message to a group the caller belongs to.
    pub async fn send(
        &self,
        user_id: &str,
        group_id: &str,
        input: SendMessageInput,
    ) -> AppResult<group_message::Model> {
        input.validate()?;
        let content = non_blank(&input.content, "Message content")?;

        self.require_member(group_id, user_id).await?;

        if let Some(reply_to_id) = input.reply_to_id.as_deref() {
            if self.message_in_group(group_id, reply_to_id).await?.is_none() {
                return Err(AppError::BadRequest(
                    "Reply target must be a message in this group".to_string(),
                ));
            }
        }

        let model = group_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            sender_id: Set(user_id.to_string()),
            content: Set(content.to_string()),
            reply_to_id: Set(input.reply_to_id),
            created_at: Set(Utc::now().into()),
            edited_at: Set(None),
        };

        self.message_repo.create(model).await
    }

    /// Read a window of history, oldest first.
    pub async fn list(
        &self,
        user_id: &str,
        group_id: &str,
        window: &MessageWindow,
    ) -> AppResult<Vec<group_message::Model>> {
        self.require_member(group_id, user_id).await?;

        let cursor = match (window.before.as_deref(), window.after.as_deref()) {
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "Use either before or after, not both".to_string(),
                ));
            }
            (Some(id), None) => MessageCursor::Before(self.anchor(group_id, id).await?),
            (None, Some(id)) => MessageCursor::After(self.anchor(group_id, id).await?),
            (None, None) => MessageCursor::Latest,
        };

        let limit = window.limit.unwrap_or(DEFAULT_WINDOW).clamp(1, MAX_WINDOW);
        self.message_repo.find_window(group_id, &cursor, limit).await
    }

    /// Edit one of the caller's messages.
    pub async fn edit(
        &self,
        user_id: &str,
        group_id: &str,
        message_id: &str,
        input: EditMessageInput,
    ) -> AppResult<group_message::Model> {
        input.validate()?;
        let content = non_blank(&input.content, "Message content")?;

        let found = self.message_in_group(group_id, message_id).await?;
        let message = ensure_owner(found, user_id, "Message")?;

        let mut active: group_message::ActiveModel = message.into();
        active.content = Set(content.to_string());
        active.edited_at = Set(Some(Utc::now().into()));

        self.message_repo.update(active).await
    }

    /// Delete a message as its sender or a group admin.
    pub async fn delete(&self, user_id: &str, group_id: &str, message_id: &str) -> AppResult<()> {
        let message = self
            .message_in_group(group_id, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.sender_id != user_id {
            let can_manage = self
                .group_repo
                .get_member(group_id, user_id)
                .await?
                .is_some_and(|m| m.role.can_manage());
            if !can_manage {
                return Err(AppError::Unauthorized(
                    "You are not allowed to modify this message".to_string(),
                ));
            }
        }

        self.message_repo.delete(&message.id).await
    }
}
