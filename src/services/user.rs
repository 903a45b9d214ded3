//! User service
//!
//! Registration, token login/logout, session validation, password changes
//! and the optional staff account bootstrapped at startup.

use crate::config::AdminAccountConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Session, User, UserRole};
use crate::serializers::{
    password_field, FieldErrors, SetPasswordInput, UserCreateInput, UserCreateValidator,
    Validator, REQUIRED,
};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Returned for any failed login so callers can't probe which emails exist
pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Field-level validation failure
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// User does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for UserServiceError {
    fn from(errors: FieldErrors) -> Self {
        UserServiceError::Validation(errors)
    }
}

/// Login payload
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User service for managing accounts and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            user_repo,
            session_repo,
        }
    }

    /// Register a new (non-staff) user
    pub async fn register(&self, input: UserCreateInput) -> Result<User, UserServiceError> {
        let email_taken = match input.email.as_deref() {
            Some(email) => self
                .user_repo
                .get_by_email(email)
                .await
                .context("Failed to check email")?
                .is_some(),
            None => false,
        };
        let username_taken = match input.username.as_deref() {
            Some(username) => self
                .user_repo
                .get_by_username(username)
                .await
                .context("Failed to check username")?
                .is_some(),
            None => false,
        };

        let validated = UserCreateValidator {
            email_taken,
            username_taken,
        }
        .validate(input)?;

        let password_hash = hash_password(&validated.password)?;
        let user = User::new(
            validated.username,
            validated.email,
            validated.first_name,
            validated.last_name,
            password_hash,
            validated.role.unwrap_or_default(),
        );

        match self.user_repo.create(&user).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, username = %created.username, "User registered");
                Ok(created)
            }
            // Lost a race with a concurrent registration
            Err(e) if is_unique_violation(&e) => {
                let errors = if format!("{:#}", e).contains("users.username") {
                    FieldErrors::single("username", "A user with that username already exists.")
                } else {
                    FieldErrors::single("email", "A user with this email already exists.")
                };
                Err(errors.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and issue a new auth token
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let mut errors = FieldErrors::new();
        if matches!(input.email.as_deref(), None | Some("")) {
            errors.add("email", REQUIRED);
        }
        if matches!(input.password.as_deref(), None | Some("")) {
            errors.add("password", REQUIRED);
        }
        let (email, password) = match (input.email, input.password) {
            (Some(email), Some(password)) if errors.is_empty() => (email, password),
            _ => return Err(errors.into()),
        };

        let invalid = || UserServiceError::Validation(FieldErrors::single("non_field_errors", INVALID_CREDENTIALS));

        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::issue(user.id))
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Invalidate a token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a token to its user. Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        Ok(self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {} not found", id)))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self.user_repo.list(params).await.context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change the password after checking the current one
    pub async fn set_password(&self, user: &User, input: SetPasswordInput) -> Result<(), UserServiceError> {
        let mut errors = FieldErrors::new();
        let current = password_field(&mut errors, "current_password", input.current_password);
        let new = password_field(&mut errors, "new_password", input.new_password);

        if let Some(current) = &current {
            if !verify_password(current, &user.password_hash)? {
                errors.add("current_password", "Invalid password.");
            }
        }

        let new = match new {
            Some(new) if errors.is_empty() => new,
            _ => return Err(errors.into()),
        };

        let password_hash = hash_password(&new)?;
        self.user_repo
            .update_password(user.id, &password_hash)
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Create the configured staff account unless its email is already registered
    pub async fn ensure_admin(&self, account: &AdminAccountConfig) -> Result<Option<User>, UserServiceError> {
        if self
            .user_repo
            .get_by_email(&account.email)
            .await
            .context("Failed to check admin account")?
            .is_some()
        {
            return Ok(None);
        }

        let user = User::new(
            account.username.clone(),
            account.email.clone(),
            account.first_name.clone(),
            account.last_name.clone(),
            hash_password(&account.password)?,
            UserRole::Admin,
        );
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create admin account")?;

        tracing::info!(user_id = created.id, email = %created.email, "Admin account created");
        Ok(Some(created))
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired_sessions(&self) -> Result<i64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to purge expired sessions")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::testing::migrated_pool;
    use crate::db::DbPool;
    use chrono::{Duration, Utc};

    fn service(pool: &DbPool) -> UserService {
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        )
    }

    fn registration(username: &str, email: &str) -> UserCreateInput {
        UserCreateInput {
            username: Some(username.to_string()),
            first_name: Some("Anna".to_string()),
            last_name: Some("Petrova".to_string()),
            email: Some(email.to_string()),
            password: Some("Sup3r-secret".to_string()),
        }
    }

    fn login(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn field_errors(err: UserServiceError) -> FieldErrors {
        match err {
            UserServiceError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let pool = migrated_pool().await;
        let service = service(&pool);

        let user = service.register(registration("anna", "anna@example.com")).await.unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_ne!(user.password_hash, "Sup3r-secret");

        let session = service.login(login("anna@example.com", "Sup3r-secret")).await.unwrap();
        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_reused_email() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        service.register(registration("anna", "anna@example.com")).await.unwrap();

        let errors = field_errors(
            service
                .register(registration("other", "anna@example.com"))
                .await
                .unwrap_err(),
        );
        assert_eq!(errors.get("email").unwrap(), ["A user with this email already exists."]);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        service.register(registration("anna", "anna@example.com")).await.unwrap();

        let wrong_password = field_errors(service.login(login("anna@example.com", "nope")).await.unwrap_err());
        let unknown_email = field_errors(service.login(login("ghost@example.com", "nope")).await.unwrap_err());
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password.get("non_field_errors").unwrap(), [INVALID_CREDENTIALS]);

        let missing = field_errors(service.login(LoginInput::default()).await.unwrap_err());
        assert!(missing.contains("email"));
        assert!(missing.contains("password"));
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        let user = service.register(registration("anna", "anna@example.com")).await.unwrap();

        let mut session = Session::issue(user.id);
        session.expires_at = Utc::now() - Duration::minutes(1);
        let sessions = SqlxSessionRepository::new(pool.clone());
        sessions.create(&session).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_password() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        let user = service.register(registration("anna", "anna@example.com")).await.unwrap();

        let errors = field_errors(
            service
                .set_password(
                    &user,
                    SetPasswordInput {
                        current_password: Some("wrong".to_string()),
                        new_password: Some("An0ther-secret".to_string()),
                    },
                )
                .await
                .unwrap_err(),
        );
        assert_eq!(errors.get("current_password").unwrap(), ["Invalid password."]);

        service
            .set_password(
                &user,
                SetPasswordInput {
                    current_password: Some("Sup3r-secret".to_string()),
                    new_password: Some("An0ther-secret".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(service.login(login("anna@example.com", "Sup3r-secret")).await.is_err());
        assert!(service.login(login("anna@example.com", "An0ther-secret")).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        let account = AdminAccountConfig {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "Adm1n-pass".to_string(),
            first_name: "Admin".to_string(),
            last_name: "Admin".to_string(),
        };

        let created = service.ensure_admin(&account).await.unwrap().unwrap();
        assert!(created.is_staff());
        assert!(service.ensure_admin(&account).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let pool = migrated_pool().await;
        let service = service(&pool);
        let anna = service.register(registration("anna", "anna@example.com")).await.unwrap();
        service.register(registration("boris", "boris@example.com")).await.unwrap();

        assert_eq!(service.get_by_id(anna.id).await.unwrap().username, "anna");
        assert!(matches!(
            service.get_by_id(999).await.unwrap_err(),
            UserServiceError::NotFound(_)
        ));

        let page = service.list(&ListParams::new(1, 1, 100)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
    }
}
