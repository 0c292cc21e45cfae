//! Database repositories.
//!
//! Each repository wraps one aggregate. Methods suffixed with `_in` take an
//! explicit connection so they can run inside a caller-owned transaction.

mod bookmark;
mod category;
mod comment;
mod content_vote;
mod file_upload;
mod group;
mod group_message;
mod note;
mod notification;
mod password_reset;
mod question;
mod quiz;
mod report;
mod user;

pub use bookmark::BookmarkRepository;
pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use content_vote::ContentVoteRepository;
pub use file_upload::FileUploadRepository;
pub use group::GroupRepository;
pub use group_message::{GroupMessageRepository, MessageCursor};
pub use note::NoteRepository;
pub use notification::NotificationRepository;
pub use password_reset::PasswordResetRepository;
pub use question::QuestionRepository;
pub use quiz::{AttemptSummary, QuizRepository};
pub use report::ReportRepository;
pub use user::UserRepository;

use sea_orm::{
    ColumnTrait, Condition, DbErr, SqlErr,
    sea_query::{Expr, Func},
};
use studyhub_common::AppError;

/// Which unapproved rows a content query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Approved rows only.
    Approved,
    /// Approved rows plus the unapproved rows authored by this user.
    ApprovedOrOwnedBy(String),
    /// Every row, approved or not.
    All,
}

impl Visibility {
    /// Build the predicate for a table with the given approval and owner columns.
    pub fn condition<C: ColumnTrait>(&self, approved: C, owner: C) -> Condition {
        match self {
            Self::Approved => Condition::all().add(approved.eq(true)),
            Self::ApprovedOrOwnedBy(user_id) => Condition::any()
                .add(approved.eq(true))
                .add(owner.eq(user_id.as_str())),
            Self::All => Condition::all(),
        }
    }

    /// Evaluate the same predicate against an already loaded row.
    #[must_use]
    pub fn allows(&self, is_approved: bool, owner_id: &str) -> bool {
        match self {
            Self::Approved => is_approved,
            Self::ApprovedOrOwnedBy(user_id) => is_approved || user_id == owner_id,
            Self::All => true,
        }
    }
}

/// Filters shared by note and question listings.
#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    /// Restrict to a category.
    pub category_id: Option<String>,
    /// Restrict to an author.
    pub author_id: Option<String>,
    /// Restrict to rows carrying this (lowercased) tag.
    pub tag: Option<String>,
    /// Case-insensitive substring match on title or content.
    pub search: Option<String>,
    /// Rows to skip.
    pub offset: u64,
    /// Page size.
    pub limit: u64,
}

impl ContentQuery {
    /// Build the filter predicate (without visibility) for a content table.
    pub(crate) fn condition<C: ColumnTrait>(
        &self,
        category: C,
        author: C,
        title: C,
        content: C,
    ) -> Condition {
        let mut condition = Condition::all();

        if let Some(category_id) = &self.category_id {
            condition = condition.add(category.eq(category_id.as_str()));
        }

        if let Some(author_id) = &self.author_id {
            condition = condition.add(author.eq(author_id.as_str()));
        }

        if let Some(tag) = &self.tag {
            // PostgreSQL: tags @> '["tag"]'::jsonb
            let tag_json = serde_json::json!([tag.to_lowercase()]).to_string();
            condition = condition.add(Expr::cust_with_values("tags @> $1::jsonb", [tag_json]));
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(title))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(content))).like(pattern)),
            );
        }

        condition
    }
}

/// Lowercased `%...%` pattern with LIKE wildcards escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Map an insert error, turning unique-key violations into a conflict.
pub(crate) fn insert_error(e: DbErr, conflict: &str) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(conflict.to_string()),
        _ => AppError::Database(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }

    #[test]
    fn test_visibility_allows() {
        let own = Visibility::ApprovedOrOwnedBy("u1".to_string());
        assert!(own.allows(false, "u1"));
        assert!(!own.allows(false, "u2"));
        assert!(!Visibility::Approved.allows(false, "u1"));
        assert!(Visibility::All.allows(false, "u2"));
    }

    #[test]
    fn test_insert_error_passthrough() {
        let err = insert_error(DbErr::Custom("boom".to_string()), "dup");
        assert!(matches!(err, AppError::Database(_)));
    }
}
