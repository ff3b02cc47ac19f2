//! Error Kind
//!
//! [`ErrorKind`] is the HTTP-facing classification of an [`AppError`].
//! Status, reason phrase and problem `type` URI all come from one table.
//!
//! [`AppError`]: super::app_error::AppError

use serde::Serialize;

/// Error classification, one variant per status code the API emits
///
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// assert_eq!(ErrorKind::Locked.status_code(), 423);
/// assert_eq!(ErrorKind::from_status_code(404), Some(ErrorKind::NotFound));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    Conflict,
    Gone,
    UnprocessableEntity,
    /// Account lockout (RFC 4918)
    Locked,
    TooManyRequests,
    UnavailableForLegalReasons,
    InternalServerError,
    ServiceUnavailable,
}

struct Meta {
    status: u16,
    reason: &'static str,
    problem_type: &'static str,
}

const fn meta(
    status: u16,
    reason: &'static str,
    problem_type: &'static str,
) -> Meta {
    Meta {
        status,
        reason,
        problem_type,
    }
}

const RFC9110: &str = "https://tools.ietf.org/html/rfc9110";

impl ErrorKind {
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::RequestTimeout,
        ErrorKind::Conflict,
        ErrorKind::Gone,
        ErrorKind::UnprocessableEntity,
        ErrorKind::Locked,
        ErrorKind::TooManyRequests,
        ErrorKind::UnavailableForLegalReasons,
        ErrorKind::InternalServerError,
        ErrorKind::ServiceUnavailable,
    ];

    const fn meta(&self) -> Meta {
        match self {
            ErrorKind::BadRequest => meta(400, "Bad Request", "#section-15.5.1"),
            ErrorKind::Unauthorized => meta(401, "Unauthorized", "#section-15.5.2"),
            ErrorKind::Forbidden => meta(403, "Forbidden", "#section-15.5.4"),
            ErrorKind::NotFound => meta(404, "Not Found", "#section-15.5.5"),
            ErrorKind::RequestTimeout => meta(408, "Request Timeout", "#section-15.5.9"),
            ErrorKind::Conflict => meta(409, "Conflict", "#section-15.5.10"),
            ErrorKind::Gone => meta(410, "Gone", "#section-15.5.11"),
            ErrorKind::UnprocessableEntity => {
                meta(422, "Unprocessable Entity", "#section-15.5.21")
            }
            ErrorKind::Locked => meta(
                423,
                "Locked",
                "https://tools.ietf.org/html/rfc4918#section-11.3",
            ),
            ErrorKind::TooManyRequests => meta(
                429,
                "Too Many Requests",
                "https://tools.ietf.org/html/rfc6585#section-4",
            ),
            ErrorKind::UnavailableForLegalReasons => meta(
                451,
                "Unavailable For Legal Reasons",
                "https://tools.ietf.org/html/rfc7725#section-3",
            ),
            ErrorKind::InternalServerError => {
                meta(500, "Internal Server Error", "#section-15.6.1")
            }
            ErrorKind::ServiceUnavailable => meta(503, "Service Unavailable", "#section-15.6.4"),
        }
    }

    #[inline]
    pub const fn status_code(&self) -> u16 {
        self.meta().status
    }

    /// Reason phrase, used as the problem `title`
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.meta().reason
    }

    /// RFC 7807 `type` URI
    pub fn problem_type(&self) -> String {
        let reference = self.meta().problem_type;
        if reference.starts_with('#') {
            format!("{RFC9110}{reference}")
        } else {
            reference.to_string()
        }
    }

    pub fn from_status_code(status: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.status_code() == status)
    }

    /// 5xx; always logged at error level
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    #[inline]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status_code(), 400..=499)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_unique_and_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_status_code(kind.status_code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_status_code(418), None);
    }

    #[test]
    fn test_lockout_is_a_client_error() {
        assert_eq!(ErrorKind::Locked.status_code(), 423);
        assert!(ErrorKind::Locked.is_client_error());
        assert!(!ErrorKind::Locked.is_server_error());
        assert!(ErrorKind::ServiceUnavailable.is_server_error());
        assert!(!ErrorKind::InternalServerError.is_client_error());
    }

    #[test]
    fn test_problem_type_uris() {
        assert_eq!(
            ErrorKind::NotFound.problem_type(),
            "https://tools.ietf.org/html/rfc9110#section-15.5.5"
        );
        assert_eq!(
            ErrorKind::Locked.problem_type(),
            "https://tools.ietf.org/html/rfc4918#section-11.3"
        );
        assert_eq!(ErrorKind::Conflict.to_string(), "Conflict");
    }
}
