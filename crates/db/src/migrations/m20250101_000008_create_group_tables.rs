//! Create study group, group member and group message tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StudyGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudyGroup::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StudyGroup::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(StudyGroup::Name).string_len(128).not_null())
                    .col(ColumnDef::new(StudyGroup::Description).text())
                    .col(
                        ColumnDef::new(StudyGroup::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(StudyGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(StudyGroup::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_study_group_owner")
                            .from(StudyGroup::Table, StudyGroup::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_study_group_owner_id")
                    .table(StudyGroup::Table)
                    .col(StudyGroup::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMember::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMember::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(GroupMember::Role)
                            .string_len(16)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(GroupMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_member_group")
                            .from(GroupMember::Table, GroupMember::GroupId)
                            .to(StudyGroup::Table, StudyGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_member_user")
                            .from(GroupMember::Table, GroupMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one membership per user per group
        manager
            .create_index(
                Index::create()
                    .name("idx_group_member_group_user")
                    .table(GroupMember::Table)
                    .col(GroupMember::GroupId)
                    .col(GroupMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_member_user_id")
                    .table(GroupMember::Table)
                    .col(GroupMember::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMessage::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::SenderId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::Content).text().not_null())
                    .col(ColumnDef::new(GroupMessage::ReplyToId).string_len(32))
                    .col(
                        ColumnDef::new(GroupMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(GroupMessage::EditedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_group")
                            .from(GroupMessage::Table, GroupMessage::GroupId)
                            .to(StudyGroup::Table, StudyGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_sender")
                            .from(GroupMessage::Table, GroupMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (group_id, created_at) (for chat history)
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_group_created_at")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::GroupId)
                    .col(GroupMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudyGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StudyGroup {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    IsPrivate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GroupMember {
    Table,
    Id,
    GroupId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum GroupMessage {
    Table,
    Id,
    GroupId,
    SenderId,
    Content,
    ReplyToId,
    CreatedAt,
    EditedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
