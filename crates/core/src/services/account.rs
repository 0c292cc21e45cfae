//! Accounts: registration, login, bearer tokens, profile and password reset.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use studyhub_common::{AppError, AppResult, IdGenerator, config::AuthConfig};
use studyhub_db::{
    entities::{password_reset, user, user::Role},
    repositories::{PasswordResetRepository, UserRepository},
};
use validator::Validate;

use super::{email::EmailService, guard::require_admin};

/// Input for creating an account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Profile fields the owner may change.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Input for changing the password while signed in.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Input for completing a password reset.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// A signed-in user and their bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: user::Model,
    pub token: String,
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    reset_repo: PasswordResetRepository,
    email: EmailService,
    db: Arc<DatabaseConnection>,
    jwt_secret: String,
    token_ttl_secs: i64,
    reset_ttl_secs: i64,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        reset_repo: PasswordResetRepository,
        email: EmailService,
        db: Arc<DatabaseConnection>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            reset_repo,
            email,
            db,
            jwt_secret: auth.jwt_secret.clone(),
            token_ttl_secs: auth.token_ttl_secs,
            reset_ttl_secs: auth.reset_token_ttl_secs,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an account and sign it in.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            name: Set(input.name.trim().to_string()),
            bio: Set(None),
            avatar_url: Set(None),
            role: Set(Role::User),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "Registered account");

        let token = self.issue_token(&user.id)?;
        Ok(AuthSession { user, token })
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = self.issue_token(&user.id)?;
        Ok(AuthSession { user, token })
    }

    /// Sign a bearer token for a user.
    pub fn issue_token(&self, user_id: &str) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_token(&self, token: &str) -> AppResult<user::Model> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        self.user_repo
            .find_by_id(&data.claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
    }

    /// Update the caller's profile.
    pub async fn update_profile(
        &self,
        user: &user::Model,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let mut active: user::ActiveModel = user.clone().into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Change the caller's password after checking the current one.
    pub async fn change_password(
        &self,
        user: &user::Model,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        input.validate()?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.clone().into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Start a password reset.
    ///
    /// Always succeeds so callers cannot learn which emails are registered.
    /// Mail only goes out for existing accounts; failures are logged.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        if let Err(e) = self.send_reset_token(email).await {
            tracing::warn!(error = %e, "Password reset request failed");
        }
        Ok(())
    }

    async fn send_reset_token(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        self.reset_repo.invalidate_for_user(&user.id).await?;

        let token = generate_reset_token();
        let now = Utc::now();
        let model = password_reset::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            token_hash: Set(hash_token(&token)),
            expires_at: Set((now + Duration::seconds(self.reset_ttl_secs)).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        };
        self.reset_repo.create(model).await?;

        self.email
            .send_password_reset(&user.email, &user.name, &token, self.reset_ttl_secs / 60)
            .await
    }

    /// Complete a password reset with the mailed token.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<()> {
        input.validate()?;
        let invalid = || AppError::BadRequest("Invalid or expired reset token".to_string());

        let reset = self
            .reset_repo
            .find_by_token_hash(&hash_token(input.token.trim()))
            .await?
            .ok_or_else(invalid)?;
        if reset.used_at.is_some() || reset.expires_at < Utc::now() {
            return Err(invalid());
        }

        let password_hash = hash_password(&input.new_password)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // The claim is conditional, so only one of two racing requests wins
        if !self.reset_repo.claim_in(&txn, &reset.id).await? {
            return Err(invalid());
        }
        let changed = self
            .user_repo
            .set_password_hash_in(&txn, &reset.user_id, &password_hash)
            .await?;
        if changed == 0 {
            return Err(invalid());
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %reset.user_id, "Password reset completed");
        Ok(())
    }

    /// Change another account's role; admins only.
    pub async fn set_role(
        &self,
        admin: &user::Model,
        user_id: &str,
        role: Role,
    ) -> AppResult<user::Model> {
        require_admin(admin)?;
        if admin.id == user_id {
            return Err(AppError::BadRequest(
                "You cannot change your own role".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;

        tracing::info!(user_id = %user.id, ?role, admin = %admin.id, "Role changed");
        Ok(user)
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 256 random bits, hex encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest of a reset token is stored.
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::guard::test_support;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            reset_token_ttl_secs: 3600,
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> AccountService {
        let db = Arc::new(db);
        AccountService::new(
            UserRepository::new(db.clone()),
            PasswordResetRepository::new(db.clone()),
            EmailService::disabled(),
            db,
            &auth_config(),
        )
    }

    fn user_with_password(id: &str, password: &str) -> user::Model {
        let mut user = test_support::user(id, Role::User);
        user.password_hash = hash_password(password).unwrap();
        user
    }

    fn create_test_reset(expires_in: i64, used: bool) -> password_reset::Model {
        let now = Utc::now();
        password_reset::Model {
            id: "r1".to_string(),
            user_id: "alice".to_string(),
            token_hash: hash_token("token"),
            expires_at: (now + Duration::seconds(expires_in)).into(),
            used_at: used.then(|| now.into()),
            created_at: now.into(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_reset_token());
        assert_eq!(hash_token(&token).len(), 64);
    }

    #[tokio::test]
    async fn test_token_roundtrip() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("alice", Role::User)]])
            .into_connection();
        let service = service(db);

        let token = service.issue_token("alice").unwrap();
        let user = service.authenticate_token(&token).await.unwrap();
        assert_eq!(user.id, "alice");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(db)
            .authenticate_token("not-a-jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_with_password("alice", "correct horse")]])
            .into_connection();

        let err = service(db)
            .login(LoginInput {
                email: "alice@example.com".to_string(),
                password: "battery staple".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("alice", Role::User)]])
            .into_connection();

        let err = service(db)
            .register(RegisterInput {
                email: "Alice@Example.com".to_string(),
                password: "long enough".to_string(),
                name: "Alice".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_short_password_is_validation_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(db)
            .register(RegisterInput {
                email: "alice@example.com".to_string(),
                password: "short".to_string(),
                name: "Alice".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reset_request_for_unknown_email_succeeds() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        service(db)
            .request_password_reset("nobody@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_request_swallows_store_failures() {
        // No mocked rows: the lookup fails, the caller still sees success.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        service(db)
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_request_stores_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("alice", Role::User)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[create_test_reset(3600, false)]])
            .into_connection();

        service(db)
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_reset(-10, false)]])
            .into_connection();

        let err = service(db)
            .reset_password(ResetPasswordInput {
                token: "token".to_string(),
                new_password: "brand new pass".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_used_reset_token_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_reset(3600, true)]])
            .into_connection();

        let err = service(db)
            .reset_password(ResetPasswordInput {
                token: "token".to_string(),
                new_password: "brand new pass".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    fn reset_input() -> ResetPasswordInput {
        ResetPasswordInput {
            token: "token".to_string(),
            new_password: "brand new pass".to_string(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_reset_claims_token_and_sets_password_together() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_reset(3600, false)]])
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
        );
        let svc = AccountService::new(
            UserRepository::new(db.clone()),
            PasswordResetRepository::new(db.clone()),
            EmailService::disabled(),
            db.clone(),
            &auth_config(),
        );

        svc.reset_password(reset_input()).await.unwrap();
        drop(svc);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 2);
        let statements = log[1].statements();
        // BEGIN, claim, password, COMMIT
        assert_eq!(statements.len(), 4);
        assert!(statements[1].sql.contains(r#""used_at" IS NULL"#));
        assert!(statements[2].sql.contains(r#""password_hash" = $"#));
    }

    #[tokio::test]
    async fn test_reset_token_claimed_concurrently_is_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_reset(3600, false)]])
                .append_exec_results([exec(0)])
                .into_connection(),
        );
        let svc = AccountService::new(
            UserRepository::new(db.clone()),
            PasswordResetRepository::new(db.clone()),
            EmailService::disabled(),
            db.clone(),
            &auth_config(),
        );

        let err = svc.reset_password(reset_input()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        drop(svc);

        // The password was never touched
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert!(
            log.iter()
                .flat_map(|t| t.statements())
                .all(|s| !s.sql.contains("password_hash"))
        );
    }

    #[tokio::test]
    async fn test_set_role_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let moderator = test_support::user("mod", Role::Moderator);

        let err = service(db)
            .set_role(&moderator, "alice", Role::Moderator)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
