//! Content reports and their moderation.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{
        ReportTarget,
        notification::NotificationKind,
        report::{self, ReportStatus},
        user,
    },
    repositories::ReportRepository,
};
use validator::Validate;

use super::{
    PageParams,
    content::ContentStore,
    guard::{ensure_owner, require_moderator},
    notification::{NewNotification, NotificationService},
};

/// Input for reporting a note, question or comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub target_type: ReportTarget,
    pub target_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Input for moving a report forward.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportInput {
    pub status: ReportStatus,
    #[validate(length(max = 1000))]
    pub moderator_note: Option<String>,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    content: ContentStore,
    report_repo: ReportRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        content: ContentStore,
        report_repo: ReportRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            content,
            report_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report. Each user may report a target once.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateReportInput,
    ) -> AppResult<report::Model> {
        input.validate()?;

        let owner = self
            .content
            .lookup(input.target_type)
            .owner_of(&input.target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report target not found".to_string()))?;

        if owner == user_id {
            return Err(AppError::BadRequest(
                "You cannot report your own content".to_string(),
            ));
        }

        if self
            .report_repo
            .find_for_pair(user_id, input.target_type, &input.target_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already reported this content".to_string(),
            ));
        }

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(user_id.to_string()),
            target_type: Set(input.target_type),
            target_id: Set(input.target_id),
            reason: Set(input.reason.trim().to_string()),
            status: Set(ReportStatus::Pending),
            moderator_id: Set(None),
            moderator_note: Set(None),
            created_at: Set(Utc::now().into()),
            reviewed_at: Set(None),
        };

        let report = self.report_repo.create(model).await?;
        tracing::info!(
            report_id = %report.id,
            target_type = %report.target_type,
            target_id = %report.target_id,
            "Report filed"
        );
        Ok(report)
    }

    /// Move a report forward. The reporter cannot review their own report.
    pub async fn review(
        &self,
        moderator: &user::Model,
        id: &str,
        input: ReviewReportInput,
    ) -> AppResult<report::Model> {
        require_moderator(moderator)?;
        input.validate()?;

        let report = self.report_repo.get_by_id(id).await?;
        if report.reporter_id == moderator.id {
            return Err(AppError::Forbidden(
                "You cannot review your own report".to_string(),
            ));
        }
        if !report.status.can_transition_to(input.status) {
            return Err(AppError::BadRequest(format!(
                "Cannot move report from {:?} to {:?}",
                report.status, input.status
            )));
        }

        let reporter_id = report.reporter_id.clone();
        let mut active: report::ActiveModel = report.into();
        active.status = Set(input.status);
        active.moderator_id = Set(Some(moderator.id.clone()));
        active.moderator_note = Set(input.moderator_note);
        active.reviewed_at = Set(Some(Utc::now().into()));
        let report = self.report_repo.update(active).await?;

        if report.status == ReportStatus::Resolved {
            self.notifications
                .notify_quietly(NewNotification::about(
                    &reporter_id,
                    &moderator.id,
                    NotificationKind::ReportResolved,
                    "report",
                    &report.id,
                    "Your report has been resolved".to_string(),
                ))
                .await;
        }

        Ok(report)
    }

    /// Reports for moderators, optionally filtered by status.
    pub async fn list(
        &self,
        moderator: &user::Model,
        status: Option<ReportStatus>,
        page: &PageParams,
    ) -> AppResult<Vec<report::Model>> {
        require_moderator(moderator)?;
        self.report_repo
            .find_by_status(status, page.limit(), page.offset())
            .await
    }

    /// Reports filed by the caller.
    pub async fn list_mine(
        &self,
        user_id: &str,
        page: &PageParams,
    ) -> AppResult<Vec<report::Model>> {
        self.report_repo
            .find_by_reporter(user_id, page.limit(), page.offset())
            .await
    }

    /// Withdraw one of the caller's reports while it is still pending.
    pub async fn withdraw(&self, user_id: &str, id: &str) -> AppResult<()> {
        let found = self.report_repo.find_by_id(id).await?;
        let report = ensure_owner(found, user_id, "Report")?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::BadRequest(
                "Only pending reports can be withdrawn".to_string(),
            ));
        }
        self.report_repo.delete(&report.id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use studyhub_db::{
        entities::{note, user::Role},
        repositories::NotificationRepository,
    };

    fn create_test_report(id: &str, reporter_id: &str, status: ReportStatus) -> report::Model {
        report::Model {
            id: id.to_string(),
            reporter_id: reporter_id.to_string(),
            target_type: ReportTarget::Note,
            target_id: "n1".to_string(),
            reason: "spam".to_string(),
            status,
            moderator_id: None,
            moderator_note: None,
            created_at: Utc::now().into(),
            reviewed_at: None,
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> ReportService {
        let db = Arc::new(db);
        ReportService::new(
            ContentStore::new(db.clone()),
            ReportRepository::new(db.clone()),
            NotificationService::new(NotificationRepository::new(db)),
        )
    }

    fn input() -> CreateReportInput {
        CreateReportInput {
            target_type: ReportTarget::Note,
            target_id: "n1".to_string(),
            reason: "spam".to_string(),
        }
    }

    #[tokio::test]
    async fn test_report_missing_target_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();

        let err = service(db).create("alice", input()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_second_report_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", true)]])
            .append_query_results([[create_test_report("r1", "alice", ReportStatus::Pending)]])
            .into_connection();

        let err = service(db).create("alice", input()).await.unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "You have already reported this content")
        );
    }

    #[tokio::test]
    async fn test_report_own_content_is_bad_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "alice", true)]])
            .into_connection();

        let err = service(db).create("alice", input()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_first_report_is_created() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::note("n1", "bob", true)]])
            .append_query_results([
                Vec::<report::Model>::new(),
                vec![create_test_report("r1", "alice", ReportStatus::Pending)],
            ])
            .into_connection();

        let report = service(db).create("alice", input()).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_reporter_cannot_review_own_report() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_report("r1", "mod", ReportStatus::Pending)]])
            .into_connection();
        let moderator = test_support::user("mod", Role::Moderator);

        let err = service(db)
            .review(
                &moderator,
                "r1",
                ReviewReportInput {
                    status: ReportStatus::Resolved,
                    moderator_note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_review_cannot_move_backwards() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_report("r1", "alice", ReportStatus::Resolved)]])
            .into_connection();
        let moderator = test_support::user("mod", Role::Moderator);

        let err = service(db)
            .review(
                &moderator,
                "r1",
                ReviewReportInput {
                    status: ReportStatus::Reviewed,
                    moderator_note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_plain_user_cannot_list_reports() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let user = test_support::user("alice", Role::User);

        let err = service(db)
            .list(&user, None, &PageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_withdraw_reviewed_report_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_report("r1", "alice", ReportStatus::Reviewed)]])
            .into_connection();

        let err = service(db).withdraw("alice", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
