//! Conversions into [`AppError`] and out to HTTP
//!
//! Only foreign errors that actually reach a request boundary are mapped.

use super::app_error::AppError;
#[cfg(feature = "sqlx")]
use super::kind::ErrorKind;

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::bad_request("Invalid number").with_source(err)
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::bad_request("Invalid identifier format").with_source(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::bad_request(format!("Malformed JSON: {err}")).with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}

// ============================================================================
// PostgreSQL (feature-gated)
// ============================================================================

/// Maps a SQLSTATE to the error a client should see.
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>.
#[cfg(feature = "sqlx")]
pub fn from_sqlstate(code: &str) -> (ErrorKind, &'static str) {
    match code {
        "23505" => (ErrorKind::Conflict, "Duplicate key value"),
        "23503" => (ErrorKind::Conflict, "Referenced record does not exist"),
        "23000" | "23001" => (ErrorKind::Conflict, "Integrity constraint violation"),
        "23502" => (ErrorKind::BadRequest, "Required field is null"),
        "23514" | "22001" => (ErrorKind::BadRequest, "Value violates a column constraint"),
        "40001" | "40P01" => (ErrorKind::Conflict, "Concurrent update, please retry"),
        "42501" => (ErrorKind::Forbidden, "Insufficient privilege"),
        c if c.starts_with("53") || c.starts_with("57") => {
            (ErrorKind::ServiceUnavailable, "Database unavailable")
        }
        _ => (ErrorKind::InternalServerError, "Database error"),
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let mapped = match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::service_unavailable("Database connection unavailable")
            }
            sqlx::Error::Database(db) => {
                let (kind, message) = db
                    .code()
                    .map_or((ErrorKind::InternalServerError, "Database error"), |code| {
                        from_sqlstate(&code)
                    });
                let mapped = AppError::new(kind, message);
                match db.constraint() {
                    Some(constraint) if kind == ErrorKind::Conflict => {
                        mapped.with_code(format!("Database.{constraint}"))
                    }
                    _ => mapped,
                }
            }
            _ => AppError::internal("Database error"),
        };
        mapped.with_source(err)
    }
}

// ============================================================================
// Axum (feature-gated)
// ============================================================================

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{HeaderValue, StatusCode, header};

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, axum::Json(self.problem())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind::ErrorKind;

    #[test]
    fn test_bad_identifier_is_a_client_error() {
        let err: AppError = "not-a-uuid".parse::<uuid::Uuid>().unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_malformed_json_is_a_client_error() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{\"email\":")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.message().starts_with("Malformed JSON"));
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_sqlstate_mapping() {
        assert_eq!(from_sqlstate("23505").0, ErrorKind::Conflict);
        assert_eq!(from_sqlstate("40P01").0, ErrorKind::Conflict);
        assert_eq!(from_sqlstate("57P01").0, ErrorKind::ServiceUnavailable);
        assert_eq!(from_sqlstate("42P01").0, ErrorKind::InternalServerError);
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
