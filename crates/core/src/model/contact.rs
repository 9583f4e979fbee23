use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::MessageId;

/// Subject stored when the sender leaves it blank.
pub const DEFAULT_SUBJECT: &str = "No subject";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContactError {
    #[error("sender name cannot be empty")]
    EmptyName,

    #[error("sender email cannot be empty")]
    EmptyEmail,

    #[error("message cannot be empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

impl NewContactMessage {
    /// # Errors
    ///
    /// Returns `ContactError` when name, email or message is blank.
    pub fn new(
        name: &str,
        email: &str,
        subject: Option<&str>,
        message: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, ContactError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ContactError::EmptyName);
        }
        let email = email.trim();
        if email.is_empty() {
            return Err(ContactError::EmptyEmail);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ContactError::EmptyMessage);
        }
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT);

        Ok(Self {
            name: name.to_owned(),
            email: email.to_owned(),
            subject: subject.to_owned(),
            message: message.to_owned(),
            sent_at,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: MessageId) -> ContactMessage {
        ContactMessage {
            id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            sent_at: self.sent_at,
            is_read: false,
        }
    }
}

/// A message left through the public contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub id: MessageId,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}
