//! Outbox Error Types

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type OutboxResult<T> = Result<T, OutboxError>;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    #[error("Failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OutboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OutboxError::InvalidEventType(_) => ErrorKind::BadRequest,
            OutboxError::Serialization(_)
            | OutboxError::Database(_)
            | OutboxError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OutboxError::InvalidEventType(_) => "Outbox.InvalidEventType",
            OutboxError::Serialization(_) => "Outbox.Serialization",
            OutboxError::Database(_) => "Outbox.Database",
            OutboxError::Internal(_) => "Outbox.Internal",
        }
    }

    /// Convert to AppError. Server-side details are not exposed.
    pub fn to_app_error(&self) -> AppError {
        let message = if self.kind().is_server_error() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        AppError::new(self.kind(), message).with_code(self.code())
    }
}

impl From<OutboxError> for AppError {
    fn from(err: OutboxError) -> Self {
        match &err {
            OutboxError::Database(e) => tracing::error!(error = %e, "Outbox database error"),
            OutboxError::Serialization(e) => {
                tracing::error!(error = %e, "Outbox serialization error")
            }
            OutboxError::Internal(msg) => tracing::error!(message = %msg, "Outbox internal error"),
            OutboxError::InvalidEventType(_) => tracing::debug!(error = %err, "Outbox error"),
        }
        err.to_app_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_masked() {
        let app = OutboxError::Internal("pool exhausted".to_string()).to_app_error();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.code(), Some("Outbox.Internal"));
        assert!(!app.message().contains("pool"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let app = OutboxError::InvalidEventType("too long".to_string()).to_app_error();
        assert_eq!(app.status_code(), 400);
        assert!(app.message().contains("too long"));
    }
}
