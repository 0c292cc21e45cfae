//! Business logic services.

pub mod account;
pub mod bookmark;
pub mod category;
pub mod chat;
pub mod comment;
pub mod content;
pub mod email;
pub mod file;
pub mod group;
pub mod guard;
pub mod note;
pub mod notification;
pub mod question;
pub mod quiz;
pub mod report;
pub mod stats;
pub mod storage;
pub mod visibility;
pub mod vote;

pub use account::{
    AccountService, AuthSession, ChangePasswordInput, Claims, LoginInput, RegisterInput,
    ResetPasswordInput, UpdateProfileInput,
};
pub use bookmark::{BookmarkService, BookmarkToggle};
pub use category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use chat::{ChatService, EditMessageInput, MessageWindow, SendMessageInput};
pub use comment::{CommentService, CreateCommentInput, UpdateCommentInput};
pub use content::{ContentItem, ContentStore, TargetLookup};
pub use email::EmailService;
pub use file::{FileService, UploadInput};
pub use group::{AddMemberInput, CreateGroupInput, GroupDetail, GroupService, UpdateGroupInput};
pub use guard::{Owned, ensure_owner, ensure_owner_or_moderator, require_admin, require_moderator};
pub use note::{CreateNoteInput, NoteListQuery, NoteService, UpdateNoteInput};
pub use notification::{NewNotification, NotificationService};
pub use question::{CreateQuestionInput, QuestionListQuery, QuestionService, UpdateQuestionInput};
pub use quiz::{
    AnswerResult, AttemptResult, CreateQuizInput, QuizDetail, QuizQuestionView, QuizService,
    SubmitAttemptInput, UpdateQuizInput,
};
pub use report::{CreateReportInput, ReportService, ReviewReportInput};
pub use stats::{PlatformStats, StatsService, UserStats};
pub use storage::{LocalStorage, NoOpStorage, StorageBackend};
pub use visibility::visibility_for;
pub use vote::{VoteAction, VoteOutcome, VoteService};

use serde::{Deserialize, Serialize};
use studyhub_common::{AppError, AppResult};

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page/limit pair accepted by every paginated listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Items per page, capped at [`MAX_PAGE_SIZE`].
    pub limit: Option<u64>,
}

impl PageParams {
    /// Build params for an explicit page and limit.
    #[must_use]
    pub const fn new(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Effective page number (at least 1).
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip for the effective page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// One page of results plus the total matching the same filter.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows matching the filter across all pages.
    pub total: u64,
    /// Effective page number.
    pub page: u64,
    /// Effective page size.
    pub limit: u64,
}

impl<T> Paginated<T> {
    /// Wrap a page fetched with `params`.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, params: &PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page(),
            limit: params.limit(),
        }
    }
}

/// Normalize free-form tags: trimmed, lowercased, deduplicated, order kept.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Trim user text, rejecting input that is only whitespace.
pub(crate) fn non_blank<'a>(text: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be blank")));
    }
    Ok(trimmed)
}
