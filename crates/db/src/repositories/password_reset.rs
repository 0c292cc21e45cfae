//! Password reset token repository.

use std::sync::Arc;

use crate::entities::{PasswordReset, password_reset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use studyhub_common::{AppError, AppResult};

/// Password reset repository for database operations.
#[derive(Clone)]
pub struct PasswordResetRepository {
    db: Arc<DatabaseConnection>,
}

impl PasswordResetRepository {
    /// Create a new password reset repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a new reset token.
    pub async fn create(
        &self,
        model: password_reset::ActiveModel,
    ) -> AppResult<password_reset::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a reset token by the hash of its raw value.
    pub async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> AppResult<Option<password_reset::Model>> {
        PasswordReset::find()
            .filter(password_reset::Column::TokenHash.eq(token_hash))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Consume a token if it is still unused and unexpired.
    ///
    /// Returns `false` when another request got there first. The row stays
    /// locked until `conn`'s transaction ends.
    pub async fn claim_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<bool> {
        let now = chrono::Utc::now().fixed_offset();
        let result = PasswordReset::update_many()
            .col_expr(password_reset::Column::UsedAt, Expr::value(now))
            .filter(password_reset::Column::Id.eq(id))
            .filter(password_reset::Column::UsedAt.is_null())
            .filter(password_reset::Column::ExpiresAt.gt(now))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Invalidate every outstanding token of a user.
    pub async fn invalidate_for_user(&self, user_id: &str) -> AppResult<u64> {
        let result = PasswordReset::update_many()
            .col_expr(
                password_reset::Column::UsedAt,
                Expr::value(chrono::Utc::now().fixed_offset()),
            )
            .filter(password_reset::Column::UserId.eq(user_id))
            .filter(password_reset::Column::UsedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
