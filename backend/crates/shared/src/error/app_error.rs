//! Application Error
//!
//! [`AppError`] is what crosses the HTTP boundary. Bounded contexts keep
//! their own `thiserror` enums and convert into it at the edge.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use serde::Serialize;

use super::kind::ErrorKind;

type Text = Cow<'static, str>;

/// A single validation failure attached to a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Text,
    pub message: Text,
}

impl FieldError {
    pub fn new(field: impl Into<Text>, message: impl Into<Text>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Unified application error
///
/// * `message` is shown to clients as the problem `detail`
/// * `code` is a stable machine code such as `User.EmailNotUnique`
/// * `source` is kept for logs and never serialized
///
/// ```rust
/// use kernel::error::app_error::AppError;
///
/// let err = AppError::conflict("Email already registered")
///     .with_code("User.EmailNotUnique")
///     .with_action("Sign in instead");
/// assert_eq!(err.status_code(), 409);
/// ```
pub struct AppError {
    kind: ErrorKind,
    message: Text,
    action: Option<Text>,
    code: Option<Text>,
    field_errors: Vec<FieldError>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

pub type AppResult<T> = Result<T, AppError>;

macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(message: impl Into<Text>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Text>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            code: None,
            field_errors: Vec::new(),
            source: None,
        }
    }

    kind_constructors! {
        bad_request => BadRequest,
        unauthorized => Unauthorized,
        forbidden => Forbidden,
        not_found => NotFound,
        conflict => Conflict,
        gone => Gone,
        unprocessable => UnprocessableEntity,
        locked => Locked,
        too_many_requests => TooManyRequests,
        internal => InternalServerError,
        service_unavailable => ServiceUnavailable,
    }

    /// 400 carrying per-field failures
    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        Self::bad_request("One or more validation errors occurred")
            .with_code("Validation.Failed")
            .with_field_errors(field_errors)
    }

    pub fn with_action(mut self, action: impl Into<Text>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<Text>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_field_errors(mut self, field_errors: Vec<FieldError>) -> Self {
        self.field_errors = field_errors;
        self
    }

    /// Attach the underlying error (never sent to clients)
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    #[inline]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[inline]
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }

    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.kind.is_client_error()
    }

    /// RFC 7807 body for this error
    pub fn problem(&self) -> ProblemDetails<'_> {
        ProblemDetails {
            problem_type: self.kind.problem_type(),
            title: self.kind.as_str(),
            status: self.status_code(),
            detail: self.message(),
            action: self.action(),
            code: self.code(),
            errors: self.field_errors(),
            success: false,
        }
    }
}

/// Problem Details (RFC 7807) as written to the wire
///
/// `success: false` mirrors the success envelope so clients can branch on
/// one field.
#[derive(Debug, Serialize)]
pub struct ProblemDetails<'a> {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: &'static str,
    pub status: u16,
    pub detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "no_field_errors")]
    pub errors: &'a [FieldError],
    pub success: bool,
}

fn no_field_errors(errors: &&[FieldError]) -> bool {
    errors.is_empty()
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder
            .field("kind", &self.kind)
            .field("message", &self.message);
        if let Some(code) = &self.code {
            builder.field("code", code);
        }
        if !self.field_errors.is_empty() {
            builder.field("field_errors", &self.field_errors);
        }
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}: {}", self.kind, code, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

// ============================================================================
// Result / Option extensions
// ============================================================================

pub trait ResultExt<T, E> {
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Text>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Text>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static,
    {
        self.map_err(|e| AppError::new(kind, message).with_source(e))
    }
}

pub trait OptionExt<T> {
    fn ok_or_app_err(self, kind: ErrorKind, message: impl Into<Text>) -> AppResult<T>;

    fn ok_or_not_found(self, message: impl Into<Text>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_app_err(self, kind: ErrorKind, message: impl Into<Text>) -> AppResult<T> {
        self.ok_or_else(|| AppError::new(kind, message))
    }

    fn ok_or_not_found(self, message: impl Into<Text>) -> AppResult<T> {
        self.ok_or_app_err(ErrorKind::NotFound, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_pick_the_kind() {
        assert_eq!(AppError::bad_request("x").kind(), ErrorKind::BadRequest);
        assert_eq!(AppError::locked("x").status_code(), 423);
        assert_eq!(AppError::unprocessable("x").status_code(), 422);
        assert_eq!(AppError::service_unavailable("x").status_code(), 503);
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::conflict("Email already registered").with_code("User.EmailNotUnique");
        assert_eq!(
            err.to_string(),
            "[Conflict] User.EmailNotUnique: Email already registered"
        );
        assert_eq!(AppError::not_found("Address not found").to_string(), "[Not Found] Address not found");
    }

    #[test]
    fn test_problem_body() {
        let err = AppError::validation(vec![
            FieldError::new("email", "Email is required"),
            FieldError::new("password", "Password is too short"),
        ]);
        let body = serde_json::to_value(err.problem()).unwrap();

        assert_eq!(body["status"], 400);
        assert_eq!(body["title"], "Bad Request");
        assert_eq!(body["code"], "Validation.Failed");
        assert_eq!(body["errors"][1]["field"], "password");
        assert_eq!(body["success"], false);
        assert!(body.get("action").is_none());
    }

    #[test]
    fn test_locked_problem_carries_action() {
        let err = AppError::locked("Account locked").with_action("Try again in 15 minutes");
        let body = serde_json::to_value(err.problem()).unwrap();
        assert_eq!(body["action"], "Try again in 15 minutes");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn test_source_is_kept_for_logs() {
        let parse = "abc".parse::<i32>().unwrap_err();
        let err = AppError::bad_request("Invalid page").with_source(parse);
        assert!(err.source().is_some());
        assert!(format!("{err:?}").contains("source"));
    }

    #[test]
    fn test_extensions() {
        let missing: Option<u8> = None;
        assert_eq!(missing.ok_or_not_found("Session not found").unwrap_err().status_code(), 404);

        let failed: Result<(), std::fmt::Error> = Err(std::fmt::Error);
        let err = failed.map_app_err(ErrorKind::InternalServerError, "Render failed").unwrap_err();
        assert!(err.is_server_error());
    }
}
