//! Email Value Object
//!
//! Trimmed and lowercased on construction so that lookups and the unique
//! index agree. Only syntax is checked here; ownership is
//! proven by the confirmation link.

use std::fmt;
use std::str::FromStr;

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const EMAIL_MAX_LENGTH: usize = 256;
const LOCAL_PART_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> AppResult<Self> {
        let email = email.into().trim().to_lowercase();
        match Self::problem(&email) {
            None => Ok(Self(email)),
            Some(message) => Err(AppError::bad_request(message)),
        }
    }

    fn problem(email: &str) -> Option<&'static str> {
        if email.is_empty() {
            return Some("Email is required");
        }
        if email.chars().count() > EMAIL_MAX_LENGTH {
            return Some("Email must be at most 256 characters");
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Some("Invalid email format");
        };

        let local_ok = !local.is_empty()
            && local.len() <= LOCAL_PART_MAX_LENGTH
            && !local.chars().any(char::is_whitespace);

        let labels_ok = domain.contains('.')
            && domain.split('.').all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });

        (!(local_ok && labels_ok)).then_some("Invalid email format")
    }

    /// Trusted value read back from storage
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }

    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }

    /// `a***@example.com`, for log lines
    pub fn masked(&self) -> String {
        let mut local = self.local_part().chars();
        match local.next() {
            Some(first) => format!("{first}***@{}", self.domain()),
            None => format!("***@{}", self.domain()),
        }
    }
}

impl FromStr for Email {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Email::new(s)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = Email::new("  Ana.Souza+Loja@Example.COM.br ").unwrap();
        assert_eq!(email.as_str(), "ana.souza+loja@example.com.br");
        assert_eq!(email.local_part(), "ana.souza+loja");
        assert_eq!(email.domain(), "example.com.br");
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for bad in [
            "",
            "   ",
            "ana.example.com",
            "ana@",
            "@example.com",
            "ana@@example.com",
            "ana@example",
            "ana@example..com",
            "ana@-example.com",
            "an a@example.com",
        ] {
            assert!(Email::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_required_message() {
        let err = Email::new(" ").unwrap_err();
        assert_eq!(err.message(), "Email is required");
    }

    #[test]
    fn test_length_limits() {
        let long_domain = format!("ana@{}.com", "b".repeat(260));
        assert!(Email::new(long_domain).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(Email::new(long_local).is_err());
    }

    #[test]
    fn test_masked() {
        let email = Email::new("ana@example.com").unwrap();
        assert_eq!(email.masked(), "a***@example.com");
    }
}
