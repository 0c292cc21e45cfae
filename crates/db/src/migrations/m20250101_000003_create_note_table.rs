//! Create note table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Note::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Note::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Note::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Note::CategoryId).string_len(32))
                    .col(ColumnDef::new(Note::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Note::Content).text().not_null())
                    .col(
                        ColumnDef::new(Note::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Note::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Note::Upvotes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Note::Downvotes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Note::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Note::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_user")
                            .from(Note::Table, Note::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_category")
                            .from(Note::Table, Note::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for author listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_note_user_id")
                    .table(Note::Table)
                    .col(Note::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: (is_approved, created_at) (for public listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_note_approved_created_at")
                    .table(Note::Table)
                    .col(Note::IsApproved)
                    .col(Note::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_note_category_id")
                    .table(Note::Table)
                    .col(Note::CategoryId)
                    .to_owned(),
            )
            .await?;

        // GIN index for tag containment queries
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX IF NOT EXISTS idx_note_tags ON note USING GIN (tags)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Note::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Note {
    Table,
    Id,
    UserId,
    CategoryId,
    Title,
    Content,
    Tags,
    IsApproved,
    Upvotes,
    Downvotes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}
