//! Shared error types for the services crate.

use thiserror::Error;

use pylearn_core::model::{CatalogError, ContactError, QuestionError, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::password::HashError;
use crate::session::AdminRequired;

/// Errors emitted by `AnswerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerServiceError {
    #[error("question not found")]
    QuestionNotFound,
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Forbidden(#[from] AdminRequired),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Forbidden(#[from] AdminRequired),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountServiceError {
    #[error(transparent)]
    Forbidden(#[from] AdminRequired),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("email is already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("administrators cannot delete their own account here")]
    CannotDeleteSelf,
    #[error(transparent)]
    User(#[from] UserError),
    #[error("password hashing failed: {0}")]
    Hash(HashError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<HashError> for AccountServiceError {
    fn from(err: HashError) -> Self {
        Self::Hash(err)
    }
}

impl From<StorageError> for AccountServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => Self::EmailTaken,
            StorageError::NotFound => Self::UserNotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by `ContactService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContactServiceError {
    #[error(transparent)]
    Forbidden(#[from] AdminRequired),
    #[error("message not found")]
    NotFound,
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
