//! Discriminators for polymorphic rows (votes, bookmarks, comments, reports).

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_common::AppError;

/// Kind of votable, bookmarkable and commentable content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[sea_orm(string_value = "note")]
    Note,
    #[sea_orm(string_value = "question")]
    Question,
}

impl ContentType {
    /// Wire name of the discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Question => "question",
        }
    }

    /// Capitalized label used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Question => "Question",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" => Ok(Self::Note),
            "question" => Ok(Self::Question),
            other => Err(AppError::BadRequest(format!(
                "Invalid content type: {other}"
            ))),
        }
    }
}

/// Anything a user can file a report against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    #[sea_orm(string_value = "note")]
    Note,
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "comment")]
    Comment,
}

impl ReportTarget {
    /// Wire name of the discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Question => "question",
            Self::Comment => "comment",
        }
    }
}

impl From<ContentType> for ReportTarget {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Note => Self::Note,
            ContentType::Question => Self::Question,
        }
    }
}

impl fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comment" => Ok(Self::Comment),
            other => other.parse::<ContentType>().map(Into::into).map_err(|_| {
                AppError::BadRequest(format!("Invalid report target type: {other}"))
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        assert_eq!("note".parse::<ContentType>().unwrap(), ContentType::Note);
        assert_eq!(
            " Question ".parse::<ContentType>().unwrap(),
            ContentType::Question
        );
        assert!(matches!(
            "quiz".parse::<ContentType>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_report_target_parse() {
        assert_eq!(
            "comment".parse::<ReportTarget>().unwrap(),
            ReportTarget::Comment
        );
        assert_eq!("note".parse::<ReportTarget>().unwrap(), ReportTarget::Note);
        let err = "user".parse::<ReportTarget>().unwrap_err();
        assert!(err.to_string().contains("Invalid report target type"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ContentType::Question).unwrap(),
            "\"question\""
        );
        let target: ReportTarget = serde_json::from_str("\"comment\"").unwrap();
        assert_eq!(target, ReportTarget::Comment);
    }
}
