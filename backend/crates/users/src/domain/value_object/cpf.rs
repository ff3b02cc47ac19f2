//! CPF Value Object (Brazilian individual taxpayer id)
//!
//! Accepts `NNNNNNNNNNN` or `NNN.NNN.NNN-NN` and checks both verifier digits.
//! Stored as 11 bare digits.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cpf(String);

impl Cpf {
    pub fn new(cpf: &str) -> AppResult<Self> {
        let cpf = cpf.trim();
        if cpf.is_empty() {
            return Err(AppError::bad_request("CPF is required"));
        }

        if !Self::is_accepted_shape(cpf) {
            return Err(AppError::bad_request(
                "CPF must be 11 digits or formatted as 000.000.000-00",
            ));
        }

        let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
        if !Self::has_valid_check_digits(&digits) {
            return Err(AppError::bad_request("Invalid CPF"));
        }

        Ok(Self(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect()))
    }

    fn is_accepted_shape(cpf: &str) -> bool {
        let bytes = cpf.as_bytes();
        match bytes.len() {
            11 => bytes.iter().all(u8::is_ascii_digit),
            14 => bytes.iter().enumerate().all(|(i, b)| match i {
                3 | 7 => *b == b'.',
                11 => *b == b'-',
                _ => b.is_ascii_digit(),
            }),
            _ => false,
        }
    }

    fn has_valid_check_digits(digits: &[u32]) -> bool {
        if digits.len() != 11 {
            return false;
        }
        // 000.000.000-00, 111.111.111-11, ... pass the arithmetic but are invalid
        if digits.iter().all(|d| *d == digits[0]) {
            return false;
        }

        let check = |len: usize| {
            let weight = len as u32 + 1;
            let sum: u32 = digits[..len]
                .iter()
                .enumerate()
                .map(|(i, d)| d * (weight - i as u32))
                .sum();
            let remainder = sum % 11;
            if remainder < 2 { 0 } else { 11 - remainder }
        };

        check(9) == digits[9] && check(10) == digits[10]
    }

    pub fn from_db(cpf: impl Into<String>) -> Self {
        Self(cpf.into())
    }

    /// Bare digits
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `000.000.000-00`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        if d.len() != 11 {
            return d.clone();
        }
        format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..])
    }
}

impl std::fmt::Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cpf_forms() {
        let bare = Cpf::new("52998224725").unwrap();
        let formatted = Cpf::new("529.982.247-25").unwrap();
        assert_eq!(bare, formatted);
        assert_eq!(bare.as_str(), "52998224725");
        assert_eq!(bare.formatted(), "529.982.247-25");
        assert!(Cpf::new("111.444.777-35").is_ok());
    }

    #[test]
    fn test_invalid_check_digits() {
        assert!(Cpf::new("529.982.247-26").is_err());
        assert!(Cpf::new("11144477734").is_err());
    }

    #[test]
    fn test_repeated_digits_rejected() {
        assert!(Cpf::new("000.000.000-00").is_err());
        assert!(Cpf::new("99999999999").is_err());
    }

    #[test]
    fn test_bad_shapes_rejected() {
        assert!(Cpf::new("").is_err());
        assert!(Cpf::new("5299822472").is_err());
        assert!(Cpf::new("529-982-247.25").is_err());
        assert!(Cpf::new("529.982.24725").is_err());
        assert!(Cpf::new("abc.def.ghi-jk").is_err());
    }
}
