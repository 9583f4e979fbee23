use std::sync::Arc;

use pylearn_core::model::{NewUser, User, UserId, normalize_email};
use storage::repository::UserRepository;

use crate::error::AccountServiceError;
use crate::password::{hash_password, verify_password};
use crate::session::{SessionContext, SessionStore};

/// A freshly opened login session.
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub session: SessionContext,
    pub user: User,
}

fn require_password(password: &str) -> Result<&str, AccountServiceError> {
    if password.is_empty() {
        return Err(AccountServiceError::EmptyPassword);
    }
    Ok(password)
}

/// Registration, login and account maintenance, plus the administrator's
/// user management.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    sessions: SessionStore,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, sessions: SessionStore) -> Self {
        Self { users, sessions }
    }

    async fn user(&self, id: UserId) -> Result<User, AccountServiceError> {
        self.users
            .get_user(id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AccountServiceError> {
        let hash = hash_password(require_password(password)?)?;
        let user = self
            .users
            .insert_user(NewUser::new(name, email, hash, is_admin)?)
            .await?;
        tracing::info!(user = %user.id(), is_admin, "account created");
        Ok(user)
    }

    // ─── SESSION ───────────────────────────────────────────────────────────────

    /// Resolve a bearer token to its live session.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<SessionContext> {
        self.sessions.resolve(token)
    }

    /// Self-service registration; always creates a non-admin account.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::EmailTaken` for a registered email, or a
    /// validation error for blank fields.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountServiceError> {
        self.create(name, email, password, false).await
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::InvalidCredentials` for an unknown email
    /// or wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Login, AccountServiceError> {
        let user = self
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .filter(|u| verify_password(password, u.password_hash()))
            .ok_or_else(|| {
                tracing::warn!("login rejected");
                AccountServiceError::InvalidCredentials
            })?;
        let (token, session) = self.sessions.open(&user);
        tracing::info!(user = %user.id(), "login");
        Ok(Login {
            token,
            session,
            user,
        })
    }

    /// Returns whether the token was live.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.close(token)
    }

    // ─── OWN ACCOUNT ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `AccountServiceError::UserNotFound` if the account is gone.
    pub async fn current_user(&self, session: &SessionContext) -> Result<User, AccountServiceError> {
        self.user(session.user_id).await
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::EmailTaken` if another account owns the
    /// email, or a validation error for blank fields.
    pub async fn update_profile(
        &self,
        session: &SessionContext,
        name: &str,
        email: &str,
    ) -> Result<User, AccountServiceError> {
        let updated = self.user(session.user_id).await?.with_profile(name, email)?;
        self.users.update_user(&updated).await?;
        self.sessions.refresh_user(&updated);
        tracing::info!(user = %updated.id(), "profile updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::InvalidCredentials` if `old_password`
    /// does not verify.
    pub async fn change_password(
        &self,
        session: &SessionContext,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountServiceError> {
        let new_password = require_password(new_password)?;
        let user = self.user(session.user_id).await?;
        if !verify_password(old_password, user.password_hash()) {
            tracing::warn!(user = %user.id(), "password change rejected");
            return Err(AccountServiceError::InvalidCredentials);
        }
        self.users
            .update_user(&user.with_password_hash(hash_password(new_password)?)?)
            .await?;
        tracing::info!(user = %user.id(), "password changed");
        Ok(())
    }

    /// Forgotten-password reset by email.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UserNotFound` for an unknown email.
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<(), AccountServiceError> {
        let new_password = require_password(new_password)?;
        let user = self
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        self.users
            .update_user(&user.with_password_hash(hash_password(new_password)?)?)
            .await?;
        self.sessions.close_user(user.id());
        tracing::info!(user = %user.id(), "password reset");
        Ok(())
    }

    /// Delete the caller's own account with its answers and progress.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UserNotFound` if the account is gone.
    pub async fn delete_account(&self, session: &SessionContext) -> Result<(), AccountServiceError> {
        self.users.delete_user(session.user_id).await?;
        self.sessions.close_user(session.user_id);
        tracing::info!(user = %session.user_id, "account deleted by owner");
        Ok(())
    }

    // ─── ADMIN ─────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `AccountServiceError::Forbidden` for non-admins.
    pub async fn list_users(&self, session: &SessionContext) -> Result<Vec<User>, AccountServiceError> {
        session.require_admin()?;
        Ok(self.users.list_users().await?)
    }

    /// Create an account on someone's behalf, optionally as administrator.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::Forbidden` for non-admins, or the same
    /// errors as `register`.
    pub async fn add_user(
        &self,
        session: &SessionContext,
        name: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AccountServiceError> {
        session.require_admin()?;
        self.create(name, email, password, is_admin).await
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::UserNotFound` for an unknown user.
    pub async fn set_password(
        &self,
        session: &SessionContext,
        user_id: UserId,
        new_password: &str,
    ) -> Result<(), AccountServiceError> {
        session.require_admin()?;
        let new_password = require_password(new_password)?;
        let user = self.user(user_id).await?;
        self.users
            .update_user(&user.with_password_hash(hash_password(new_password)?)?)
            .await?;
        tracing::info!(user = %user_id, admin = %session.user_id, "password set by admin");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AccountServiceError::CannotDeleteSelf` when the target is the
    /// caller, or `AccountServiceError::UserNotFound` for an unknown user.
    pub async fn delete_user(
        &self,
        session: &SessionContext,
        user_id: UserId,
    ) -> Result<(), AccountServiceError> {
        session.require_admin()?;
        if user_id == session.user_id {
            return Err(AccountServiceError::CannotDeleteSelf);
        }
        self.users.delete_user(user_id).await?;
        self.sessions.close_user(user_id);
        tracing::info!(user = %user_id, admin = %session.user_id, "user deleted");
        Ok(())
    }

    /// Create the administrator account unless the email is already taken.
    /// Returns whether an account was created.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError` for invalid fields or backend failure.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, AccountServiceError> {
        if self
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .is_some()
        {
            return Ok(false);
        }
        self.create(name, email, password, true).await?;
        Ok(true)
    }
}
