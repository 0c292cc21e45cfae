//! Application state and API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use studyhub_common::Config;
use studyhub_core::{
    AccountService, BookmarkService, CategoryService, ChatService, CommentService, ContentStore,
    EmailService, FileService, GroupService, NoteService, NotificationService, QuestionService,
    QuizService, ReportService, StatsService, StorageBackend, VoteService,
};
use studyhub_db::repositories::{
    BookmarkRepository, CategoryRepository, CommentRepository, ContentVoteRepository,
    FileUploadRepository, GroupMessageRepository, GroupRepository, NoteRepository,
    NotificationRepository, PasswordResetRepository, QuestionRepository, QuizRepository,
    ReportRepository, UserRepository,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub category_service: CategoryService,
    pub note_service: NoteService,
    pub question_service: QuestionService,
    pub comment_service: CommentService,
    pub vote_service: VoteService,
    pub bookmark_service: BookmarkService,
    pub report_service: ReportService,
    pub quiz_service: QuizService,
    pub group_service: GroupService,
    pub chat_service: ChatService,
    pub notification_service: NotificationService,
    pub file_service: FileService,
    pub stats_service: StatsService,
}

impl AppState {
    /// Wire every service to one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        email: EmailService,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let note_repo = NoteRepository::new(Arc::clone(&db));
        let question_repo = QuestionRepository::new(Arc::clone(&db));
        let category_repo = CategoryRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let report_repo = ReportRepository::new(Arc::clone(&db));
        let quiz_repo = QuizRepository::new(Arc::clone(&db));
        let group_repo = GroupRepository::new(Arc::clone(&db));
        let message_repo = GroupMessageRepository::new(Arc::clone(&db));

        let content = ContentStore::new(Arc::clone(&db));
        let notification_service =
            NotificationService::new(NotificationRepository::new(Arc::clone(&db)));

        Self {
            account_service: AccountService::new(
                user_repo.clone(),
                PasswordResetRepository::new(Arc::clone(&db)),
                email,
                Arc::clone(&db),
                &config.auth,
            ),
            category_service: CategoryService::new(category_repo.clone()),
            note_service: NoteService::new(
                note_repo.clone(),
                category_repo.clone(),
                content.clone(),
            ),
            question_service: QuestionService::new(
                question_repo.clone(),
                category_repo,
                content.clone(),
            ),
            comment_service: CommentService::new(
                content.clone(),
                comment_repo.clone(),
                report_repo.clone(),
                notification_service.clone(),
            ),
            vote_service: VoteService::new(
                content.clone(),
                ContentVoteRepository::new(Arc::clone(&db)),
                notification_service.clone(),
            ),
            bookmark_service: BookmarkService::new(
                content.clone(),
                BookmarkRepository::new(Arc::clone(&db)),
            ),
            report_service: ReportService::new(
                content,
                report_repo.clone(),
                notification_service.clone(),
            ),
            quiz_service: QuizService::new(
                quiz_repo.clone(),
                question_repo.clone(),
                Arc::clone(&db),
            ),
            group_service: GroupService::new(
                group_repo.clone(),
                user_repo.clone(),
                notification_service.clone(),
                Arc::clone(&db),
            ),
            chat_service: ChatService::new(group_repo.clone(), message_repo.clone()),
            file_service: FileService::new(
                FileUploadRepository::new(Arc::clone(&db)),
                storage,
                config.storage.max_file_size,
            ),
            stats_service: StatsService::new(
                user_repo,
                note_repo,
                question_repo,
                comment_repo,
                report_repo,
                quiz_repo,
                group_repo,
                message_repo,
            ),
            notification_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token into the caller's `user::Model` and stores it in
/// the request extensions. Requests without a valid token pass through
/// anonymously; protected handlers reject them via `AuthUser`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.account_service.authenticate_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid bearer token"),
        }
    }

    next.run(req).await
}
