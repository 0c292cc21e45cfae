//! Per-user and platform-wide statistics.

use serde::Serialize;
use studyhub_common::AppResult;
use studyhub_db::{
    entities::user,
    repositories::{
        CommentRepository, GroupMessageRepository, GroupRepository, NoteRepository,
        QuestionRepository, QuizRepository, ReportRepository, UserRepository,
    },
};

use super::guard::require_moderator;

/// Activity figures for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub notes: u64,
    pub questions: u64,
    pub comments: u64,
    /// Up votes received on the user's notes and questions.
    pub upvotes_received: i64,
    pub downvotes_received: i64,
    pub quiz_attempts: i64,
    /// Share of correctly answered quiz questions, in percent.
    pub average_score: Option<f64>,
}

/// Platform-wide counters for moderators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: u64,
    pub notes: u64,
    pub questions: u64,
    pub pending_approvals: u64,
    pub open_reports: u64,
    pub groups: u64,
    pub messages: u64,
}

/// Percentage of `score` over `total`, `None` without any answered questions.
#[must_use]
pub fn average_percent(score: i64, total: i64) -> Option<f64> {
    (total > 0).then(|| (score as f64 / total as f64 * 1000.0).round() / 10.0)
}

/// Statistics service.
#[derive(Clone)]
pub struct StatsService {
    user_repo: UserRepository,
    note_repo: NoteRepository,
    question_repo: QuestionRepository,
    comment_repo: CommentRepository,
    report_repo: ReportRepository,
    quiz_repo: QuizRepository,
    group_repo: GroupRepository,
    message_repo: GroupMessageRepository,
}

impl StatsService {
    /// Create a new statistics service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        note_repo: NoteRepository,
        question_repo: QuestionRepository,
        comment_repo: CommentRepository,
        report_repo: ReportRepository,
        quiz_repo: QuizRepository,
        group_repo: GroupRepository,
        message_repo: GroupMessageRepository,
    ) -> Self {
        Self {
            user_repo,
            note_repo,
            question_repo,
            comment_repo,
            report_repo,
            quiz_repo,
            group_repo,
            message_repo,
        }
    }

    /// Activity of one user.
    pub async fn user_stats(&self, user_id: &str) -> AppResult<UserStats> {
        let notes = self.note_repo.count_by_user(user_id).await?;
        let questions = self.question_repo.count_by_user(user_id).await?;
        let comments = self.comment_repo.count_by_user(user_id).await?;
        let (note_up, note_down) = self.note_repo.sum_votes_by_user(user_id).await?;
        let (question_up, question_down) = self.question_repo.sum_votes_by_user(user_id).await?;
        let attempts = self.quiz_repo.attempt_summary(user_id).await?;

        Ok(UserStats {
            notes,
            questions,
            comments,
            upvotes_received: note_up + question_up,
            downvotes_received: note_down + question_down,
            quiz_attempts: attempts.attempts,
            average_score: average_percent(
                attempts.total_score.unwrap_or(0),
                attempts.total_questions.unwrap_or(0),
            ),
        })
    }

    /// Platform counters; moderators only.
    pub async fn platform_stats(&self, moderator: &user::Model) -> AppResult<PlatformStats> {
        require_moderator(moderator)?;

        let notes_pending = self.note_repo.count_pending().await?;
        let questions_pending = self.question_repo.count_pending().await?;

        Ok(PlatformStats {
            users: self.user_repo.count().await?,
            notes: self.note_repo.count().await?,
            questions: self.question_repo.count().await?,
            pending_approvals: notes_pending + questions_pending,
            open_reports: self.report_repo.count_open().await?,
            groups: self.group_repo.count().await?,
            messages: self.message_repo.count().await?,
        })
    }
}
