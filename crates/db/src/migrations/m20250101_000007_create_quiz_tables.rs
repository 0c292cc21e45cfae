//! Create quiz, quiz question and quiz attempt tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quiz::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Quiz::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Quiz::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Quiz::CategoryId).string_len(32))
                    .col(ColumnDef::new(Quiz::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Quiz::Description).text())
                    .col(ColumnDef::new(Quiz::TimeLimitSecs).integer())
                    .col(
                        ColumnDef::new(Quiz::IsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Quiz::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Quiz::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_user")
                            .from(Quiz::Table, Quiz::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_category")
                            .from(Quiz::Table, Quiz::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quiz_user_id")
                    .table(Quiz::Table)
                    .col(Quiz::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuizQuestion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizQuestion::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuizQuestion::QuizId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(QuizQuestion::QuestionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuizQuestion::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_question_quiz")
                            .from(QuizQuestion::Table, QuizQuestion::QuizId)
                            .to(Quiz::Table, Quiz::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_question_question")
                            .from(QuizQuestion::Table, QuizQuestion::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one question per slot
        manager
            .create_index(
                Index::create()
                    .name("idx_quiz_question_quiz_position")
                    .table(QuizQuestion::Table)
                    .col(QuizQuestion::QuizId)
                    .col(QuizQuestion::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique: a question appears at most once per quiz
        manager
            .create_index(
                Index::create()
                    .name("idx_quiz_question_quiz_question")
                    .table(QuizQuestion::Table)
                    .col(QuizQuestion::QuizId)
                    .col(QuizQuestion::QuestionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuizAttempt::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizAttempt::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuizAttempt::QuizId).string_len(32).not_null())
                    .col(ColumnDef::new(QuizAttempt::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(QuizAttempt::Score).integer().not_null())
                    .col(ColumnDef::new(QuizAttempt::Total).integer().not_null())
                    .col(ColumnDef::new(QuizAttempt::Answers).json_binary().not_null())
                    .col(
                        ColumnDef::new(QuizAttempt::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_attempt_quiz")
                            .from(QuizAttempt::Table, QuizAttempt::QuizId)
                            .to(Quiz::Table, Quiz::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_attempt_user")
                            .from(QuizAttempt::Table, QuizAttempt::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) (for attempt history)
        manager
            .create_index(
                Index::create()
                    .name("idx_quiz_attempt_user_created_at")
                    .table(QuizAttempt::Table)
                    .col(QuizAttempt::UserId)
                    .col(QuizAttempt::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuizAttempt::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuizQuestion::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quiz::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Quiz {
    Table,
    Id,
    UserId,
    CategoryId,
    Title,
    Description,
    TimeLimitSecs,
    IsPublished,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum QuizQuestion {
    Table,
    Id,
    QuizId,
    QuestionId,
    Position,
}

#[derive(Iden)]
enum QuizAttempt {
    Table,
    Id,
    QuizId,
    UserId,
    Score,
    Total,
    Answers,
    CreatedAt,
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

#[derive(Iden)]
enum Question {
    Table,
    Id,
}
