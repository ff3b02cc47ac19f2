//! Users Error Types
//!
//! Users-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Every variant carries a stable
//! machine code (`User.EmailNotUnique`) rendered in the problem body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{
    app_error::{AppError, FieldError},
    kind::ErrorKind,
};
use outbox::OutboxError;
use thiserror::Error;

/// Users-specific result type alias
pub type UsersResult<T> = Result<T, UsersError>;

#[derive(Debug, Error)]
pub enum UsersError {
    /// Input failed one or more validation rules
    #[error("One or more validation errors occurred")]
    Validation(Vec<FieldError>),

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------
    #[error("Email is already registered")]
    EmailNotUnique,

    #[error("CPF is already registered")]
    CpfNotUnique,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("Email address is already confirmed")]
    EmailAlreadyConfirmed,

    /// Confirmation or reset token is malformed, expired or forged
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("New password must be different from the current one")]
    SamePassword,

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token has expired")]
    RefreshTokenExpired,

    /// A revoked refresh token was presented again
    #[error("Refresh token has been revoked")]
    RefreshTokenReused,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------
    #[error("User not found")]
    UserNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Address not found")]
    AddressNotFound,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    // ------------------------------------------------------------------------
    // Business rules
    // ------------------------------------------------------------------------
    #[error("Address limit of {0} reached")]
    AddressLimitReached(usize),

    #[error("The default address cannot be deleted while other addresses exist")]
    CannotDeleteDefaultAddress,

    /// The row changed since it was loaded
    #[error("The resource was modified by another request")]
    ConcurrencyConflict,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("User already has role {0}")]
    RoleAlreadyAssigned(String),

    #[error("User does not have role {0}")]
    RoleNotAssigned(String),

    #[error("A user must keep at least one role")]
    CannotRemoveLastRole,

    // ------------------------------------------------------------------------
    // Infrastructure
    // ------------------------------------------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UsersError {
    /// Single-field validation failure
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        UsersError::Validation(vec![FieldError::new(field, message.into())])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            UsersError::Validation(_)
            | UsersError::InvalidToken
            | UsersError::IncorrectPassword
            | UsersError::SamePassword
            | UsersError::UnknownRole(_) => ErrorKind::BadRequest,
            UsersError::InvalidCredentials
            | UsersError::InvalidRefreshToken
            | UsersError::RefreshTokenExpired
            | UsersError::RefreshTokenReused
            | UsersError::Unauthenticated => ErrorKind::Unauthorized,
            UsersError::EmailNotConfirmed | UsersError::Forbidden => ErrorKind::Forbidden,
            UsersError::UserNotFound
            | UsersError::ProfileNotFound
            | UsersError::AddressNotFound
            | UsersError::SessionNotFound
            | UsersError::NotificationNotFound => ErrorKind::NotFound,
            UsersError::EmailNotUnique
            | UsersError::CpfNotUnique
            | UsersError::EmailAlreadyConfirmed
            | UsersError::ConcurrencyConflict
            | UsersError::RoleAlreadyAssigned(_) => ErrorKind::Conflict,
            UsersError::AddressLimitReached(_)
            | UsersError::CannotDeleteDefaultAddress
            | UsersError::RoleNotAssigned(_)
            | UsersError::CannotRemoveLastRole => ErrorKind::UnprocessableEntity,
            UsersError::AccountLocked => ErrorKind::Locked,
            UsersError::Database(e) => {
                if is_unique_violation(e) {
                    ErrorKind::Conflict
                } else {
                    ErrorKind::InternalServerError
                }
            }
            UsersError::Outbox(e) => e.kind(),
            UsersError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            UsersError::Validation(_) => "Validation.Failed",
            UsersError::EmailNotUnique => "User.EmailNotUnique",
            UsersError::CpfNotUnique => "Profile.CpfNotUnique",
            UsersError::InvalidCredentials => "Auth.InvalidCredentials",
            UsersError::AccountLocked => "Auth.AccountLocked",
            UsersError::EmailNotConfirmed => "Auth.EmailNotConfirmed",
            UsersError::EmailAlreadyConfirmed => "User.EmailAlreadyConfirmed",
            UsersError::InvalidToken => "Auth.InvalidToken",
            UsersError::IncorrectPassword => "User.IncorrectPassword",
            UsersError::SamePassword => "User.SamePassword",
            UsersError::InvalidRefreshToken => "Auth.InvalidRefreshToken",
            UsersError::RefreshTokenExpired => "Auth.RefreshTokenExpired",
            UsersError::RefreshTokenReused => "Auth.RefreshTokenReused",
            UsersError::Unauthenticated => "Auth.Unauthenticated",
            UsersError::Forbidden => "Auth.Forbidden",
            UsersError::UserNotFound => "User.NotFound",
            UsersError::ProfileNotFound => "Profile.NotFound",
            UsersError::AddressNotFound => "Address.NotFound",
            UsersError::SessionNotFound => "Session.NotFound",
            UsersError::NotificationNotFound => "Notification.NotFound",
            UsersError::AddressLimitReached(_) => "Address.LimitReached",
            UsersError::CannotDeleteDefaultAddress => "Address.CannotDeleteDefault",
            UsersError::ConcurrencyConflict => "Concurrency.Conflict",
            UsersError::UnknownRole(_) => "Role.Unknown",
            UsersError::RoleAlreadyAssigned(_) => "Role.AlreadyAssigned",
            UsersError::RoleNotAssigned(_) => "Role.NotAssigned",
            UsersError::CannotRemoveLastRole => "Role.LastRole",
            UsersError::Database(e) if is_unique_violation(e) => "Database.UniqueViolation",
            UsersError::Database(_) => "Database.Error",
            UsersError::Outbox(e) => e.code(),
            UsersError::Internal(_) => "Internal.Error",
        }
    }

    /// Convert to AppError
    ///
    /// Server-side details never leave the process.
    pub fn to_app_error(&self) -> AppError {
        let kind = self.kind();
        let message = if kind.is_server_error() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let error = AppError::new(kind, message).with_code(self.code());
        let error = match self {
            UsersError::Validation(errors) => error.with_field_errors(errors.clone()),
            UsersError::AccountLocked => error.with_action("Try again in a few minutes"),
            UsersError::EmailNotConfirmed => {
                error.with_action("Check your inbox for the confirmation email")
            }
            _ => error,
        };
        error
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            UsersError::Database(e) => {
                tracing::error!(error = %e, "Users database error");
            }
            UsersError::Outbox(e) => {
                tracing::error!(error = %e, "Users outbox error");
            }
            UsersError::Internal(msg) => {
                tracing::error!(message = %msg, "Users internal error");
            }
            UsersError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            UsersError::AccountLocked => {
                tracing::warn!("Login attempt on locked account");
            }
            UsersError::RefreshTokenReused => {
                tracing::warn!("Revoked refresh token presented");
            }
            UsersError::Forbidden => {
                tracing::warn!("Forbidden request");
            }
            _ => {
                tracing::debug!(error = %self, "Users error");
            }
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

impl IntoResponse for UsersError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<UsersError> for AppError {
    fn from(err: UsersError) -> Self {
        err.log();
        err.to_app_error()
    }
}

/// Collects field errors so a request reports every problem at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message.into()));
    }

    /// Keep the value when the check passed, otherwise record its message
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, AppError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.add(field, err.message().to_string());
                None
            }
        }
    }

    /// Required, trimmed, at most `max` characters
    pub fn required(&mut self, field: &'static str, label: &str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, format!("{label} is required"));
        } else if value.chars().count() > max {
            self.add(field, format!("{label} must be at most {max} characters"));
        }
        value.to_string()
    }

    /// Optional, trimmed, at most `max` characters; blank becomes `None`
    pub fn optional(
        &mut self,
        field: &'static str,
        label: &str,
        value: Option<&str>,
        max: usize,
    ) -> Option<String> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        if value.chars().count() > max {
            self.add(field, format!("{label} must be at most {max} characters"));
        }
        Some(value.to_string())
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> UsersResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(UsersError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(UsersError::EmailNotUnique.status_code(), StatusCode::CONFLICT);
        assert_eq!(UsersError::AccountLocked.status_code(), StatusCode::LOCKED);
        assert_eq!(UsersError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(UsersError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(UsersError::ConcurrencyConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(UsersError::AddressNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            UsersError::AddressLimitReached(10).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_app_error_carries_code() {
        let err = UsersError::EmailNotUnique.to_app_error();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.code(), Some("User.EmailNotUnique"));
    }

    #[test]
    fn test_internal_details_are_masked() {
        let err = UsersError::Internal("pool exploded at 10.0.0.3".into()).to_app_error();
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("10.0.0.3"));
    }

    #[test]
    fn test_validator_collects_every_field() {
        let mut v = Validator::new();
        v.required("firstName", "First name", "  ", 100);
        v.required("lastName", "Last name", &"x".repeat(101), 100);
        let kept = v.optional("label", "Label", Some("  Home "), 50);
        assert_eq!(kept.as_deref(), Some("Home"));
        assert_eq!(v.optional("label", "Label", Some("   "), 50), None);

        let err = v.finish().unwrap_err();
        let UsersError::Validation(errors) = &err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "firstName");

        let app = err.to_app_error();
        assert_eq!(app.code(), Some("Validation.Failed"));
        assert_eq!(app.field_errors().len(), 2);
    }

    #[test]
    fn test_validator_check_keeps_value() {
        let mut v = Validator::new();
        let ok: Option<u8> = v.check("n", Ok(7));
        assert_eq!(ok, Some(7));
        let bad: Option<u8> = v.check("n", Err(AppError::bad_request("bad number")));
        assert!(bad.is_none());
        assert!(!v.is_valid());
    }
}
