use std::fmt;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::{
    AccountServiceError, AdminRequired, AnswerServiceError, CatalogServiceError,
    ContactServiceError, ProgressServiceError,
};
use storage::repository::StorageError;

/// Handler result type
pub type Result<T> = std::result::Result<T, ApiError>;

/// Every failure a handler can report. Rendered as
/// `{"status": "error", "message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Database(StorageError),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Database(e) => write!(f, "Database error: {e}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred.".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

//
// ─── CONVERSIONS ───────────────────────────────────────────────────────────────
//

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::not_found("Not found."),
            StorageError::Conflict => ApiError::Conflict("Conflicting record.".to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl From<AdminRequired> for ApiError {
    fn from(_: AdminRequired) -> Self {
        ApiError::Forbidden("Administrator access required.".to_string())
    }
}

impl From<AnswerServiceError> for ApiError {
    fn from(err: AnswerServiceError) -> Self {
        match err {
            AnswerServiceError::QuestionNotFound => ApiError::not_found("Question not found."),
            AnswerServiceError::Question(_) => ApiError::bad_request("Invalid answer choice."),
            AnswerServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::Forbidden(e) => e.into(),
            CatalogServiceError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            CatalogServiceError::Catalog(e) => ApiError::bad_request(e.to_string()),
            CatalogServiceError::Question(e) => ApiError::bad_request(e.to_string()),
            CatalogServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::Forbidden(e) => e.into(),
            ProgressServiceError::NotFound(what) => {
                ApiError::not_found(format!("{what} not found"))
            }
            ProgressServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AccountServiceError> for ApiError {
    fn from(err: AccountServiceError) -> Self {
        match err {
            AccountServiceError::Forbidden(e) => e.into(),
            AccountServiceError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password.".to_string())
            }
            AccountServiceError::EmailTaken => {
                ApiError::Conflict("Email is already registered.".to_string())
            }
            AccountServiceError::UserNotFound => ApiError::not_found("User not found."),
            e @ (AccountServiceError::EmptyPassword
            | AccountServiceError::CannotDeleteSelf
            | AccountServiceError::User(_)) => ApiError::bad_request(e.to_string()),
            AccountServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ContactServiceError> for ApiError {
    fn from(err: ContactServiceError) -> Self {
        match err {
            ContactServiceError::Forbidden(e) => e.into(),
            ContactServiceError::NotFound => ApiError::not_found("Message not found."),
            ContactServiceError::Contact(e) => ApiError::bad_request(e.to_string()),
            ContactServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        let status = |e: StorageError| ApiError::from(e).into_response().status();
        assert_eq!(status(StorageError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(StorageError::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status(StorageError::Connection("gone".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn account_errors_map_to_statuses() {
        let status = |e: AccountServiceError| ApiError::from(e).into_response().status();
        assert_eq!(status(AccountServiceError::EmailTaken), StatusCode::CONFLICT);
        assert_eq!(
            status(AccountServiceError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AccountServiceError::CannotDeleteSelf),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AccountServiceError::Forbidden(AdminRequired)),
            StatusCode::FORBIDDEN
        );
    }
}
