//! User service
//!
//! Admin accounts and their sessions:
//! - Registration is open only while no user exists, or to a signed-in user
//! - Email + password login returning a 7-day session token
//! - Session validation, logout and expired-session cleanup

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, ListParams, PagedResult, Session, UpdateUserInput, User};
use crate::services::password::{check_password_policy, hash_password, verify_password};
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const INVALID_CREDENTIALS: &str = "The email or password provided is incorrect.";

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Registration attempted without a session once a user exists
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Create a user.
    ///
    /// `requester` is the signed-in user, if any. Without one, only the very
    /// first account can be created.
    pub async fn register(
        &self,
        input: CreateUserInput,
        requester: Option<&User>,
    ) -> Result<User, UserServiceError> {
        if requester.is_none() && !self.is_first_user().await? {
            return Err(UserServiceError::Forbidden(
                "You are not allowed to perform this action.".to_string(),
            ));
        }

        let email = normalize_email(&input.email);
        self.validate_email(&email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let name = input.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let user = User::new(email, password_hash, name);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!("Registered user {}", created.id);
        Ok(created)
    }

    /// Check credentials and open a session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let password_valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        let session = Session::new(user.id, self.session_expiration_days);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a session token, or `None` when unknown or expired.
    ///
    /// Expired sessions are deleted on sight.
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
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        Ok(self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn update(&self, id: i64, input: UpdateUserInput) -> Result<User, UserServiceError> {
        let mut user = self.get(id).await?;

        if let Some(email) = input.email {
            let email = normalize_email(&email);
            self.validate_email(&email)?;
            self.ensure_email_free(&email, Some(id)).await?;
            user.email = email;
        }

        if let Some(password) = input.password {
            check_password_policy(&password).map_err(UserServiceError::ValidationError)?;
            user.password_hash = hash_password(&password).context("Failed to hash password")?;
        }

        if let Some(name) = input.name {
            user.name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        }

        user.updated_at = Utc::now();
        Ok(self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?)
    }

    /// Delete a user and every session they hold
    pub async fn delete(&self, id: i64) -> Result<(), UserServiceError> {
        self.get(id).await?;
        self.session_repo
            .delete_by_user(id)
            .await
            .context("Failed to delete user sessions")?;
        self.user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }

    /// Delete all expired sessions; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    fn validate_email(&self, email: &str) -> Result<(), UserServiceError> {
        if email.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Email is required".to_string(),
            ));
        }
        if !is_valid_email(email) {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<i64>) -> Result<(), UserServiceError> {
        let existing = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?;
        match existing {
            Some(user) if Some(user.id) != owner => Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            ))),
            _ => Ok(()),
        }
    }
}
