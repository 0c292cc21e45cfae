//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_category_table;
mod m20250101_000003_create_note_table;
mod m20250101_000004_create_question_table;
mod m20250101_000005_create_interaction_tables;
mod m20250101_000006_create_report_table;
mod m20250101_000007_create_quiz_tables;
mod m20250101_000008_create_group_tables;
mod m20250101_000009_create_notification_table;
mod m20250101_000010_create_file_upload_table;

/// Database migrator.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_category_table::Migration),
            Box::new(m20250101_000003_create_note_table::Migration),
            Box::new(m20250101_000004_create_question_table::Migration),
            Box::new(m20250101_000005_create_interaction_tables::Migration),
            Box::new(m20250101_000006_create_report_table::Migration),
            Box::new(m20250101_000007_create_quiz_tables::Migration),
            Box::new(m20250101_000008_create_group_tables::Migration),
            Box::new(m20250101_000009_create_notification_table::Migration),
            Box::new(m20250101_000010_create_file_upload_table::Migration),
        ]
    }
}
