//! State code Value Object (two-letter federative unit, e.g. `SP`)

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateCode(String);

impl StateCode {
    pub fn new(state: &str) -> AppResult<Self> {
        let state = state.trim().to_ascii_uppercase();
        if state.is_empty() {
            return Err(AppError::bad_request("State is required"));
        }
        if state.len() != 2 || !state.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(AppError::bad_request("State must be a two-letter code"));
        }
        Ok(Self(state))
    }

    pub fn from_db(state: impl Into<String>) -> Self {
        Self(state.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_code() {
        assert_eq!(StateCode::new("sp").unwrap().as_str(), "SP");
        assert_eq!(StateCode::new(" RJ ").unwrap().as_str(), "RJ");
        assert!(StateCode::new("").is_err());
        assert!(StateCode::new("SPO").is_err());
        assert!(StateCode::new("S1").is_err());
        assert!(StateCode::new("ÇA").is_err());
    }
}
