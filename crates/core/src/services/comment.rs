//! Comment service.

use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{ContentType, ReportTarget, comment, notification::NotificationKind, user},
    repositories::{CommentRepository, ReportRepository},
};
use validator::Validate;

use super::{
    PageParams,
    content::ContentStore,
    guard::{ensure_owner, ensure_owner_or_moderator},
    non_blank,
    notification::{NewNotification, NotificationService},
    visibility::visibility_for,
};

/// Input for commenting on a note or question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub content_type: ContentType,
    pub content_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    content: ContentStore,
    comment_repo: CommentRepository,
    report_repo: ReportRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        content: ContentStore,
        comment_repo: CommentRepository,
        report_repo: ReportRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            content,
            comment_repo,
            report_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a content item the caller can see.
    pub async fn create(
        &self,
        user: &user::Model,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let body = non_blank(&input.body, "Comment")?.to_string();

        let item = self
            .content
            .get_visible(
                input.content_type,
                &input.content_id,
                &visibility_for(Some(user), true),
            )
            .await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            content_type: Set(input.content_type),
            content_id: Set(input.content_id),
            body: Set(body),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let comment = self.comment_repo.create(model).await?;

        self.notifications
            .notify_quietly(NewNotification::about(
                item.owner_id(),
                &user.id,
                NotificationKind::Comment,
                item.content_type().as_str(),
                item.id(),
                format!("{} commented on \"{}\"", user.name, item.title()),
            ))
            .await;

        Ok(comment)
    }

    /// Comments on a content item, oldest first.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        content_type: ContentType,
        content_id: &str,
        page: &PageParams,
    ) -> AppResult<Vec<comment::Model>> {
        self.content
            .get_visible(content_type, content_id, &visibility_for(viewer, true))
            .await?;

        self.comment_repo
            .find_by_content(content_type, content_id, page.limit(), page.offset())
            .await
    }

    /// Edit one of the caller's comments.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let body = non_blank(&input.body, "Comment")?;

        let found = self.comment_repo.find_by_id(id).await?;
        let comment = ensure_owner(found, user_id, "Comment")?;

        let mut active: comment::ActiveModel = comment.into();
        active.body = Set(body.to_string());
        active.updated_at = Set(Some(Utc::now().into()));

        self.comment_repo.update(active).await
    }

    /// Delete a comment and the reports filed against it.
    pub async fn delete(&self, user: &user::Model, id: &str) -> AppResult<()> {
        let found = self.comment_repo.find_by_id(id).await?;
        let comment = ensure_owner_or_moderator(found, user, "Comment")?;

        let txn = self
            .content
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.report_repo
            .delete_for_targets_in(&txn, ReportTarget::Comment, vec![comment.id.clone()])
            .await?;
        self.comment_repo.delete_in(&txn, &comment.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
