//! Login History Entity
//!
//! Append-only record of sign-in attempts against a known account.

use chrono::{DateTime, Utc};
use kernel::id::{LoginHistoryId, UserId};
use platform::client::{ClientInfo, DeviceType};

use crate::domain::value_object::enums::LoginProvider;

pub const FAILURE_INVALID_PASSWORD: &str = "Invalid password";
pub const FAILURE_ACCOUNT_LOCKED: &str = "Account locked";
pub const FAILURE_EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";

#[derive(Debug, Clone)]
pub struct LoginHistory {
    pub id: LoginHistoryId,
    pub user_id: UserId,
    pub provider: LoginProvider,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
}

impl LoginHistory {
    pub fn create_success(user_id: UserId, client: &ClientInfo, now: DateTime<Utc>) -> Self {
        Self::record(user_id, true, None, client, now)
    }

    pub fn create_failure(
        user_id: UserId,
        reason: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self::record(user_id, false, Some(reason.to_string()), client, now)
    }

    fn record(
        user_id: UserId,
        success: bool,
        failure_reason: Option<String>,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LoginHistoryId::new(),
            user_id,
            provider: LoginProvider::Local,
            success,
            failure_reason,
            ip_address: client.ip_string(),
            user_agent: client.user_agent.clone(),
            device_type: client.device_type,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_reason_and_client() {
        let client = ClientInfo {
            ip: "198.51.100.4".parse().ok(),
            user_agent: Some("curl/8.0".into()),
            device_type: DeviceType::Desktop,
        };
        let entry = LoginHistory::create_failure(
            UserId::new(),
            FAILURE_INVALID_PASSWORD,
            &client,
            Utc::now(),
        );
        assert!(!entry.success);
        assert_eq!(entry.failure_reason.as_deref(), Some(FAILURE_INVALID_PASSWORD));
        assert_eq!(entry.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(entry.provider, LoginProvider::Local);
    }

    #[test]
    fn test_success_has_no_reason() {
        let entry = LoginHistory::create_success(UserId::new(), &ClientInfo::default(), Utc::now());
        assert!(entry.success);
        assert!(entry.failure_reason.is_none());
        assert_eq!(entry.device_type, DeviceType::Unknown);
    }
}
