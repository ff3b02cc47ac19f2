//! Phone number Value Object

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const PHONE_MAX_LENGTH: usize = 20;

/// Phone number as typed by the user (digits, spaces, `+()-`), 10 to 13 digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phone(String);

impl Phone {
    pub fn new(phone: &str) -> AppResult<Self> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(AppError::bad_request("Phone is required"));
        }
        if phone.chars().count() > PHONE_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "Phone must be at most {PHONE_MAX_LENGTH} characters"
            )));
        }
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-'))
        {
            return Err(AppError::bad_request("Phone contains invalid characters"));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !(10..=13).contains(&digits) {
            return Err(AppError::bad_request("Phone must have between 10 and 13 digits"));
        }

        Ok(Self(phone.to_string()))
    }

    pub fn from_db(phone: impl Into<String>) -> Self {
        Self(phone.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_valid() {
        assert!(Phone::new("(11) 98765-4321").is_ok());
        assert!(Phone::new("+55 11 98765-4321").is_ok());
        assert!(Phone::new("1133334444").is_ok());
    }

    #[test]
    fn test_phone_invalid() {
        assert!(Phone::new("").is_err());
        assert!(Phone::new("12345").is_err());
        assert!(Phone::new("11 9876x4321").is_err());
        assert!(Phone::new("+55 (11) 9 8765-4321 00").is_err());
    }
}
