//! Database entities.

#![allow(missing_docs)]

pub mod bookmark;
pub mod category;
pub mod comment;
pub mod content_type;
pub mod content_vote;
pub mod file_upload;
pub mod group_member;
pub mod group_message;
pub mod note;
pub mod notification;
pub mod password_reset;
pub mod question;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod report;
pub mod study_group;
pub mod user;

pub use bookmark::Entity as Bookmark;
pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use content_type::{ContentType, ReportTarget};
pub use content_vote::Entity as ContentVote;
pub use file_upload::Entity as FileUpload;
pub use group_member::Entity as GroupMember;
pub use group_message::Entity as GroupMessage;
pub use note::Entity as Note;
pub use notification::Entity as Notification;
pub use password_reset::Entity as PasswordReset;
pub use question::Entity as Question;
pub use quiz::Entity as Quiz;
pub use quiz_attempt::Entity as QuizAttempt;
pub use quiz_question::Entity as QuizQuestion;
pub use report::Entity as Report;
pub use study_group::Entity as StudyGroup;
pub use user::Entity as User;
