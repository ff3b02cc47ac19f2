//! Postal code (CEP) Value Object

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Brazilian CEP, stored as `NNNNN-NNN`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostalCode(String);

impl PostalCode {
    /// Accepts `NNNNN-NNN` or 8 bare digits
    pub fn new(postal_code: &str) -> AppResult<Self> {
        let postal_code = postal_code.trim();
        if postal_code.is_empty() {
            return Err(AppError::bad_request("Postal code is required"));
        }

        let bytes = postal_code.as_bytes();
        let well_formed = match bytes.len() {
            8 => bytes.iter().all(u8::is_ascii_digit),
            9 => bytes
                .iter()
                .enumerate()
                .all(|(i, b)| if i == 5 { *b == b'-' } else { b.is_ascii_digit() }),
            _ => false,
        };
        if !well_formed {
            return Err(AppError::bad_request(
                "Postal code must be formatted as 00000-000 or 00000000",
            ));
        }

        let digits: String = postal_code.chars().filter(char::is_ascii_digit).collect();
        Ok(Self(format!("{}-{}", &digits[..5], &digits[5..])))
    }

    pub fn from_db(postal_code: impl Into<String>) -> Self {
        Self(postal_code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_forms() {
        assert_eq!(PostalCode::new("01310-100").unwrap().as_str(), "01310-100");
        assert_eq!(PostalCode::new("01310100").unwrap().as_str(), "01310-100");
        assert_eq!(PostalCode::new("01310100").unwrap().digits(), "01310100");
    }

    #[test]
    fn test_postal_code_invalid() {
        assert!(PostalCode::new("").is_err());
        assert!(PostalCode::new("0131-0100").is_err());
        assert!(PostalCode::new("1234567").is_err());
        assert!(PostalCode::new("ABCDE-123").is_err());
    }
}
