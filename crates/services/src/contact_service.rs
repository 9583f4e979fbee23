use std::sync::Arc;

use pylearn_core::Clock;
use pylearn_core::model::{ContactMessage, MessageId, NewContactMessage};
use storage::repository::{ContactRepository, StorageError};

use crate::error::ContactServiceError;
use crate::session::SessionContext;

fn not_found(err: StorageError) -> ContactServiceError {
    match err {
        StorageError::NotFound => ContactServiceError::NotFound,
        other => ContactServiceError::Storage(other),
    }
}

/// Public contact form plus the administrator inbox.
#[derive(Clone)]
pub struct ContactService {
    clock: Clock,
    contacts: Arc<dyn ContactRepository>,
}

impl ContactService {
    #[must_use]
    pub fn new(clock: Clock, contacts: Arc<dyn ContactRepository>) -> Self {
        Self { clock, contacts }
    }

    /// Store a message from the public form. No session needed.
    ///
    /// # Errors
    ///
    /// Returns `ContactServiceError::Contact` when a required field is blank.
    pub async fn submit(
        &self,
        name: &str,
        email: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessage, ContactServiceError> {
        let draft = NewContactMessage::new(name, email, subject, message, self.clock.now())?;
        let stored = self.contacts.insert_message(draft).await?;
        tracing::info!(message = %stored.id, "contact message received");
        Ok(stored)
    }

    /// Unread first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns `ContactServiceError::Forbidden` for non-admins.
    pub async fn inbox(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ContactMessage>, ContactServiceError> {
        session.require_admin()?;
        Ok(self.contacts.list_messages().await?)
    }

    /// # Errors
    ///
    /// Returns `ContactServiceError::Forbidden` for non-admins.
    pub async fn unread_count(&self, session: &SessionContext) -> Result<u32, ContactServiceError> {
        session.require_admin()?;
        Ok(self.contacts.unread_count().await?)
    }

    /// Flip the read flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `ContactServiceError::NotFound` for an unknown message.
    pub async fn toggle_read(
        &self,
        session: &SessionContext,
        id: MessageId,
    ) -> Result<bool, ContactServiceError> {
        session.require_admin()?;
        self.contacts.toggle_read(id).await.map_err(not_found)
    }

    /// # Errors
    ///
    /// Returns `ContactServiceError::NotFound` for an unknown message.
    pub async fn delete(
        &self,
        session: &SessionContext,
        id: MessageId,
    ) -> Result<(), ContactServiceError> {
        session.require_admin()?;
        self.contacts.delete_message(id).await.map_err(not_found)?;
        tracing::info!(message = %id, "contact message deleted");
        Ok(())
    }
}
