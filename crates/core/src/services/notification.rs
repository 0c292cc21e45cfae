//! Notification service.

use chrono::Utc;
use sea_orm::Set;
use studyhub_common::{AppResult, IdGenerator};
use studyhub_db::{
    entities::notification::{self, NotificationKind},
    repositories::NotificationRepository,
};

use super::guard::ensure_owner;

/// A notification to deliver.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: String,
    /// User whose action triggered the notification.
    pub actor_id: Option<String>,
    pub kind: NotificationKind,
    /// Discriminator of the related row (`note`, `report`, ...).
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub message: String,
}

impl NewNotification {
    /// Notification about a subject row, triggered by `actor_id`.
    #[must_use]
    pub fn about(
        user_id: &str,
        actor_id: &str,
        kind: NotificationKind,
        subject_type: &str,
        subject_id: &str,
        message: String,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            actor_id: Some(actor_id.to_string()),
            kind,
            subject_type: Some(subject_type.to_string()),
            subject_id: Some(subject_id.to_string()),
            message,
        }
    }
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a notification.
    pub async fn create(&self, input: NewNotification) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(input.user_id),
            actor_id: Set(input.actor_id),
            kind: Set(input.kind),
            subject_type: Set(input.subject_type),
            subject_id: Set(input.subject_id),
            message: Set(input.message),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }

    /// Store a notification as a side effect of another action.
    ///
    /// Self-notifications are skipped. Failures are logged and swallowed.
    pub async fn notify_quietly(&self, input: NewNotification) {
        if input.actor_id.as_deref() == Some(input.user_id.as_str()) {
            return;
        }

        let kind = input.kind;
        let recipient = input.user_id.clone();
        if let Err(e) = self.create(input).await {
            tracing::warn!(error = %e, ?kind, recipient, "Failed to store notification");
        }
    }

    /// List a user's notifications, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only)
            .await
    }

    /// Number of unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark one of the caller's notifications as read.
    pub async fn mark_read(&self, user_id: &str, id: &str) -> AppResult<notification::Model> {
        let found = self.notification_repo.find_by_id(id).await?;
        let notification = ensure_owner(found, user_id, "Notification")?;
        self.notification_repo.mark_as_read(notification).await
    }

    /// Mark every notification of the caller as read.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Delete one of the caller's notifications.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let found = self.notification_repo.find_by_id(id).await?;
        let notification = ensure_owner(found, user_id, "Notification")?;
        self.notification_repo.delete(&notification.id).await
    }
}
