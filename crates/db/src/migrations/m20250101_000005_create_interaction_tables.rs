//! Create content vote, bookmark and comment tables.
//!
//! All three are keyed by a `(content_type, content_id)` pair pointing at a
//! note or question, so they carry no foreign key to the content itself.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContentVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContentVote::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ContentVote::ContentType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentVote::ContentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContentVote::Direction).string_len(8).not_null())
                    .col(
                        ColumnDef::new(ContentVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ContentVote::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_vote_user")
                            .from(ContentVote::Table, ContentVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one vote per user per content item
        manager
            .create_index(
                Index::create()
                    .name("idx_content_vote_user_content")
                    .table(ContentVote::Table)
                    .col(ContentVote::UserId)
                    .col(ContentVote::ContentType)
                    .col(ContentVote::ContentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (content_type, content_id, direction) (for tally recomputation)
        manager
            .create_index(
                Index::create()
                    .name("idx_content_vote_content_direction")
                    .table(ContentVote::Table)
                    .col(ContentVote::ContentType)
                    .col(ContentVote::ContentId)
                    .col(ContentVote::Direction)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookmark::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookmark::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookmark::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Bookmark::ContentType).string_len(16).not_null())
                    .col(ColumnDef::new(Bookmark::ContentId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Bookmark::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookmark_user")
                            .from(Bookmark::Table, Bookmark::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one bookmark per user per content item
        manager
            .create_index(
                Index::create()
                    .name("idx_bookmark_user_content")
                    .table(Bookmark::Table)
                    .col(Bookmark::UserId)
                    .col(Bookmark::ContentType)
                    .col(Bookmark::ContentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookmark_content")
                    .table(Bookmark::Table)
                    .col(Bookmark::ContentType)
                    .col(Bookmark::ContentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comment::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::ContentType).string_len(16).not_null())
                    .col(ColumnDef::new(Comment::ContentId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::Body).text().not_null())
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Comment::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_user")
                            .from(Comment::Table, Comment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (content_type, content_id, created_at) (for thread listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_content_created_at")
                    .table(Comment::Table)
                    .col(Comment::ContentType)
                    .col(Comment::ContentId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookmark::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContentVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ContentVote {
    Table,
    Id,
    UserId,
    ContentType,
    ContentId,
    Direction,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Bookmark {
    Table,
    Id,
    UserId,
    ContentType,
    ContentId,
    CreatedAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    UserId,
    ContentType,
    ContentId,
    Body,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
