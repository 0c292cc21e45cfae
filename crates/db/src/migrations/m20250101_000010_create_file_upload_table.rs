//! Create file upload table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileUpload::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileUpload::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FileUpload::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(FileUpload::OriginalName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FileUpload::StorageKey)
                            .string_len(512)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(FileUpload::Url).string_len(1024).not_null())
                    .col(ColumnDef::new(FileUpload::MimeType).string_len(128).not_null())
                    .col(ColumnDef::new(FileUpload::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(FileUpload::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_upload_user")
                            .from(FileUpload::Table, FileUpload::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_upload_user_id")
                    .table(FileUpload::Table)
                    .col(FileUpload::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FileUpload::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FileUpload {
    Table,
    Id,
    UserId,
    OriginalName,
    StorageKey,
    Url,
    MimeType,
    Size,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
