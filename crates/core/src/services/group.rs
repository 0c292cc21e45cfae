//! Study group service.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use studyhub_common::{AppError, AppResult, IdGenerator};
use studyhub_db::{
    entities::{
        group_member::{self, GroupRole},
        notification::NotificationKind,
        study_group, user,
    },
    repositories::{GroupRepository, UserRepository},
};
use validator::Validate;

use super::{
    PageParams,
    guard::ensure_owner,
    notification::{NewNotification, NotificationService},
};

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Input for editing a group.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

/// Input for adding someone to a group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberInput {
    pub user_id: String,
    #[serde(default)]
    pub role: GroupRole,
}

/// A group together with the caller's role in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: study_group::Model,
    pub my_role: Option<GroupRole>,
}

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(
        group_repo: GroupRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        db: Arc<DatabaseConnection>,
    ) -> Self {
        Self {
            group_repo,
            user_repo,
            notifications,
            db,
            id_gen: IdGenerator::new(),
        }
    }

    fn member_model(&self, group_id: &str, user_id: &str, role: GroupRole) -> group_member::ActiveModel {
        group_member::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            role: Set(role),
            joined_at: Set(Utc::now().into()),
        }
    }

    /// Membership row of a user in a group.
    pub async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        self.group_repo.get_member(group_id, user_id).await
    }

    /// Membership row, or `Forbidden` for non-members.
    pub async fn require_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<group_member::Model> {
        self.membership(group_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this group".to_string()))
    }

    /// Create a group; the creator becomes its owner member.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateGroupInput,
    ) -> AppResult<study_group::Model> {
        input.validate()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = study_group::ActiveModel {
            id: Set(self.id_gen.generate()),
            owner_id: Set(user_id.to_string()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            is_private: Set(input.is_private),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let group = self.group_repo.create_in(&txn, model).await?;
        self.group_repo
            .add_member_in(&txn, self.member_model(&group.id, user_id, GroupRole::Owner))
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(group_id = %group.id, owner = user_id, "Created group");
        Ok(group)
    }

    /// Fetch a group. Private groups are only visible to their members.
    pub async fn get(&self, viewer_id: Option<&str>, id: &str) -> AppResult<GroupDetail> {
        let group = self.group_repo.get_by_id(id).await?;

        let membership = match viewer_id {
            Some(user_id) => self.membership(&group.id, user_id).await?,
            None => None,
        };
        if group.is_private && membership.is_none() {
            return Err(AppError::NotFound(format!("Group not found: {id}")));
        }

        Ok(GroupDetail {
            group,
            my_role: membership.map(|m| m.role),
        })
    }

    /// Public groups, newest first.
    pub async fn list_public(&self, page: &PageParams) -> AppResult<Vec<study_group::Model>> {
        self.group_repo
            .find_public(page.limit(), page.offset())
            .await
    }

    /// Groups the caller belongs to.
    pub async fn list_joined(
        &self,
        user_id: &str,
        page: &PageParams,
    ) -> AppResult<Vec<study_group::Model>> {
        self.group_repo
            .find_joined_by_user(user_id, page.limit(), page.offset())
            .await
    }

    /// Join a public group.
    pub async fn join(&self, user_id: &str, id: &str) -> AppResult<group_member::Model> {
        let group = self.group_repo.get_by_id(id).await?;
        if group.is_private {
            return Err(AppError::Forbidden(
                "This group is private; ask an admin to add you".to_string(),
            ));
        }
        if self.membership(&group.id, user_id).await?.is_some() {
            return Err(AppError::Conflict(
                "User is already a member of this group".to_string(),
            ));
        }

        self.group_repo
            .add_member(self.member_model(&group.id, user_id, GroupRole::Member))
            .await
    }

    /// Leave a group. The owner has to delete the group instead.
    pub async fn leave(&self, user_id: &str, id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(id).await?;
        if group.owner_id == user_id {
            return Err(AppError::BadRequest(
                "The owner cannot leave the group".to_string(),
            ));
        }

        if self.group_repo.remove_member(&group.id, user_id).await? == 0 {
            return Err(AppError::NotFound(
                "You are not a member of this group".to_string(),
            ));
        }
        Ok(())
    }

    /// Add a user to a group as an owner or admin of it.
    pub async fn add_member(
        &self,
        actor: &user::Model,
        group_id: &str,
        input: AddMemberInput,
    ) -> AppResult<group_member::Model> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let actor_role = self.require_member(&group.id, &actor.id).await?.role;

        if !actor_role.can_manage() {
            return Err(AppError::Forbidden(
                "Only group admins can add members".to_string(),
            ));
        }
        match input.role {
            GroupRole::Owner => {
                return Err(AppError::BadRequest(
                    "A group has exactly one owner".to_string(),
                ));
            }
            GroupRole::Admin if !actor_role.is_owner() => {
                return Err(AppError::Forbidden(
                    "Only the owner can appoint admins".to_string(),
                ));
            }
            _ => {}
        }

        let invitee = self.user_repo.get_by_id(&input.user_id).await?;
        if self.membership(&group.id, &invitee.id).await?.is_some() {
            return Err(AppError::Conflict(
                "User is already a member of this group".to_string(),
            ));
        }

        let member = self
            .group_repo
            .add_member(self.member_model(&group.id, &invitee.id, input.role))
            .await?;

        self.notifications
            .notify_quietly(NewNotification::about(
                &invitee.id,
                &actor.id,
                NotificationKind::GroupInvite,
                "group",
                &group.id,
                format!("{} added you to {}", actor.name, group.name),
            ))
            .await;

        Ok(member)
    }

    /// Remove a member. Members may remove themselves; admins may remove
    /// members and only the owner may remove admins.
    pub async fn remove_member(
        &self,
        actor_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;
        if group.owner_id == user_id {
            return Err(AppError::BadRequest(
                "The owner cannot be removed from the group".to_string(),
            ));
        }

        if actor_id != user_id {
            let actor_role = self.require_member(&group.id, actor_id).await?.role;
            let target = self
                .membership(&group.id, user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

            let allowed = match target.role {
                GroupRole::Member => actor_role.can_manage(),
                GroupRole::Admin | GroupRole::Owner => actor_role.is_owner(),
            };
            if !allowed {
                return Err(AppError::Forbidden(
                    "You cannot remove this member".to_string(),
                ));
            }
        }

        if self.group_repo.remove_member(&group.id, user_id).await? == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        Ok(())
    }

    /// Members of a group. Private groups list members to members only.
    pub async fn list_members(
        &self,
        viewer_id: Option<&str>,
        group_id: &str,
        page: &PageParams,
    ) -> AppResult<Vec<group_member::Model>> {
        self.get(viewer_id, group_id).await?;
        self.group_repo
            .list_members(group_id, page.limit(), page.offset())
            .await
    }

    /// Edit one of the caller's groups.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<study_group::Model> {
        input.validate()?;

        let found = self.group_repo.find_by_id(id).await?;
        let group = ensure_owner(found, user_id, "Group")?;

        let mut active: study_group::ActiveModel = group.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(is_private) = input.is_private {
            active.is_private = Set(is_private);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.group_repo.update(active).await
    }

    /// Delete one of the caller's groups with its members and messages.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let found = self.group_repo.find_by_id(id).await?;
        let group = ensure_owner(found, user_id, "Group")?;
        self.group_repo.delete(&group.id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use studyhub_db::{entities::user::Role, repositories::NotificationRepository};

    fn create_test_group(id: &str, owner_id: &str, is_private: bool) -> study_group::Model {
        study_group::Model {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            name: "Algorithms".to_string(),
            description: None,
            is_private,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_member(group_id: &str, user_id: &str, role: GroupRole) -> group_member::Model {
        group_member::Model {
            id: format!("m-{user_id}"),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now().into(),
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> GroupService {
        let db = Arc::new(db);
        GroupService::new(
            GroupRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            NotificationService::new(NotificationRepository::new(db.clone())),
            db,
        )
    }

    #[tokio::test]
    async fn test_create_adds_owner_membership() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .append_query_results([[create_test_member("g1", "alice", GroupRole::Owner)]])
            .into_connection();

        let group = service(db)
            .create(
                "alice",
                CreateGroupInput {
                    name: "Algorithms".to_string(),
                    description: None,
                    is_private: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(group.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_join_private_group_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", true)]])
            .into_connection();

        let err = service(db).join("bob", "g1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_join_twice_is_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .append_query_results([[create_test_member("g1", "bob", GroupRole::Member)]])
            .into_connection();

        let err = service(db).join("bob", "g1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_owner_cannot_leave() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .into_connection();

        let err = service(db).leave("alice", "g1").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_appoint_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .append_query_results([[create_test_member("g1", "bob", GroupRole::Admin)]])
            .into_connection();
        let bob = test_support::user("bob", Role::User);

        let err = service(db)
            .add_member(
                &bob,
                "g1",
                AddMemberInput {
                    user_id: "carol".to_string(),
                    role: GroupRole::Admin,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_member_cannot_remove_others() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .append_query_results([
                [create_test_member("g1", "bob", GroupRole::Member)],
                [create_test_member("g1", "carol", GroupRole::Member)],
            ])
            .into_connection();

        let err = service(db)
            .remove_member("bob", "g1", "carol")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_private_group_hidden_from_outsiders() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", true)]])
            .append_query_results([Vec::<group_member::Model>::new()])
            .into_connection();

        let err = service(db).get(Some("mallory"), "g1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_group("g1", "alice", false)]])
            .into_connection();

        let err = service(db)
            .update("bob", "g1", UpdateGroupInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
