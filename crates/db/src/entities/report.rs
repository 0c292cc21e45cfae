//! Report entity (user reports against notes, questions and comments).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::content_type::ReportTarget;

/// Report review status.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

impl ReportStatus {
    /// Status can only move forward: pending, then reviewed, then resolved.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Reviewed | Self::Resolved) | (Self::Reviewed, Self::Resolved)
        )
    }
}

/// Unique on `(reporter_id, target_type, target_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub reporter_id: String,

    pub target_type: ReportTarget,

    pub target_id: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    pub status: ReportStatus,

    /// Moderator who last changed the status.
    #[sea_orm(nullable)]
    pub moderator_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub moderator_note: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reporter,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use ReportStatus::{Pending, Resolved, Reviewed};

        assert!(Pending.can_transition_to(Reviewed));
        assert!(Pending.can_transition_to(Resolved));
        assert!(Reviewed.can_transition_to(Resolved));

        assert!(!Reviewed.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Reviewed));
        assert!(!Pending.can_transition_to(Pending));
    }
}
