//! Study group repository (groups and their memberships).

use std::sync::Arc;

use crate::entities::{GroupMember, StudyGroup, group_member, study_group};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use studyhub_common::{AppError, AppResult};

use super::insert_error;

/// Repository for study group operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Group Operations ====================

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<study_group::Model>> {
        StudyGroup::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<study_group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Find public groups, newest first.
    pub async fn find_public(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<study_group::Model>> {
        StudyGroup::find()
            .filter(study_group::Column::IsPrivate.eq(false))
            .order_by(study_group::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find groups a user is a member of.
    pub async fn find_joined_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<study_group::Model>> {
        let group_ids: Vec<String> = GroupMember::find()
            .select_only()
            .column(group_member::Column::GroupId)
            .filter(group_member::Column::UserId.eq(user_id))
            .order_by(group_member::Column::JoinedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        StudyGroup::find()
            .filter(study_group::Column::Id.is_in(group_ids))
            .order_by(study_group::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a group.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: study_group::ActiveModel,
    ) -> AppResult<study_group::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a group.
    pub async fn update(&self, model: study_group::ActiveModel) -> AppResult<study_group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a group. Members and messages go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        StudyGroup::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all groups.
    pub async fn count(&self) -> AppResult<u64> {
        StudyGroup::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Member Operations ====================

    /// Get member record.
    pub async fn get_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member to a group.
    pub async fn add_member_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: group_member::ActiveModel,
    ) -> AppResult<group_member::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| insert_error(e, "User is already a member of this group"))
    }

    /// Add a member to a group outside any transaction.
    pub async fn add_member(
        &self,
        model: group_member::ActiveModel,
    ) -> AppResult<group_member::Model> {
        self.add_member_in(self.db.as_ref(), model).await
    }

    /// Remove a member from a group, returning rows removed.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<u64> {
        let deleted = GroupMember::delete_many()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(deleted.rows_affected)
    }

    /// List members of a group, earliest joiners first.
    pub async fn list_members(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
