use serde::Serialize;
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("email is not valid: {0}")]
    InvalidEmail(String),

    #[error("password hash cannot be empty")]
    EmptyPasswordHash,
}

/// Canonical form used for storage and uniqueness checks.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_name(name: &str) -> Result<String, UserError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UserError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn validate_email(email: &str) -> Result<String, UserError> {
    let normalized = normalize_email(email);
    if normalized.is_empty() {
        return Err(UserError::EmptyEmail);
    }
    match normalized.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(normalized),
        _ => Err(UserError::InvalidEmail(normalized)),
    }
}

//
// ─── NEW USER ──────────────────────────────────────────────────────────────────
//

/// Validated account data awaiting an id from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
}

impl NewUser {
    /// Validate name and email and wrap an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the name is blank, the email is malformed, or the
    /// hash is empty.
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
        password_hash: impl Into<String>,
        is_admin: bool,
    ) -> Result<Self, UserError> {
        let password_hash = password_hash.into();
        if password_hash.is_empty() {
            return Err(UserError::EmptyPasswordHash);
        }
        Ok(Self {
            name: validate_name(name.as_ref())?,
            email: validate_email(email.as_ref())?,
            password_hash,
            is_admin,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    #[must_use]
    pub fn assign_id(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
        }
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    #[serde(skip)]
    password_hash: String,
    is_admin: bool,
}

impl User {
    /// Rehydrate a user loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the persisted fields no longer validate.
    pub fn from_persisted(
        id: UserId,
        name: String,
        email: String,
        password_hash: String,
        is_admin: bool,
    ) -> Result<Self, UserError> {
        Ok(NewUser::new(name, email, password_hash, is_admin)?.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Replace name and email, keeping id, password and role.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the new values fail validation.
    pub fn with_profile(&self, name: &str, email: &str) -> Result<Self, UserError> {
        Ok(Self {
            name: validate_name(name)?,
            email: validate_email(email)?,
            ..self.clone()
        })
    }

    /// # Errors
    ///
    /// Returns `UserError::EmptyPasswordHash` for an empty hash.
    pub fn with_password_hash(&self, password_hash: String) -> Result<Self, UserError> {
        if password_hash.is_empty() {
            return Err(UserError::EmptyPasswordHash);
        }
        Ok(Self {
            password_hash,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let user = NewUser::new(" Ada ", "  Ada@Example.COM ", "h", false).unwrap();
        assert_eq!(user.name(), "Ada");
        assert_eq!(user.email(), "ada@example.com");
    }

    #[test]
    fn rejects_blank_name_and_bad_email() {
        assert_eq!(
            NewUser::new("  ", "a@b.c", "h", false).unwrap_err(),
            UserError::EmptyName
        );
        assert_eq!(
            NewUser::new("A", " ", "h", false).unwrap_err(),
            UserError::EmptyEmail
        );
        assert!(matches!(
            NewUser::new("A", "no-at-sign", "h", false).unwrap_err(),
            UserError::InvalidEmail(_)
        ));
        assert!(matches!(
            NewUser::new("A", "@example.com", "h", false).unwrap_err(),
            UserError::InvalidEmail(_)
        ));
    }

    #[test]
    fn profile_update_keeps_identity_and_role() {
        let user = NewUser::new("A", "a@x.io", "hash", true)
            .unwrap()
            .assign_id(UserId::new(3));
        let updated = user.with_profile("B", "B@X.io").unwrap();
        assert_eq!(updated.id(), UserId::new(3));
        assert_eq!(updated.email(), "b@x.io");
        assert_eq!(updated.password_hash(), "hash");
        assert!(updated.is_admin());
    }
}
