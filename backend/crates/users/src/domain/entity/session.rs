//! Session Entity
//!
//! One refresh-token lineage per device. Only the SHA-256 hash of the
//! refresh token is stored; rotation replaces the hash in place.

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};
use platform::client::{ClientInfo, DeviceType};

use crate::domain::event::{SessionCreated, SessionRevoked, UsersEvent};

/// Active sessions a user may keep; login revokes the oldest beyond this
pub const MAX_ACTIVE_SESSIONS: usize = 10;

pub const REVOKED_BY_LOGOUT: &str = "Logout";
pub const REVOKED_BY_USER: &str = "Revoked by user";
pub const REVOKED_BY_PASSWORD_CHANGE: &str = "Password changed";
pub const REVOKED_BY_PASSWORD_RESET: &str = "Password reset";
pub const REVOKED_SESSION_LIMIT: &str = "Session limit exceeded";
pub const REVOKED_TOKEN_REUSE: &str = "Refresh token reuse detected";
pub const REVOKED_ACCOUNT_DELETED: &str = "Account deleted";

/// Device details captured at login
#[derive(Debug, Clone, Default)]
pub struct SessionDevice {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl SessionDevice {
    pub fn from_client(client: &ClientInfo) -> Self {
        Self {
            device_type: client.device_type,
            ip_address: client.ip_string(),
            user_agent: client.user_agent.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_hash: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub(crate) events: Vec<UsersEvent>,
}

impl Session {
    pub fn create(
        user_id: UserId,
        refresh_token_hash: String,
        device: SessionDevice,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            id: SessionId::new(),
            user_id,
            refresh_token_hash,
            device_id: device.device_id,
            device_name: device.device_name,
            device_type: device.device_type,
            ip_address: device.ip_address,
            user_agent: device.user_agent,
            country: device.country,
            city: device.city,
            expires_at,
            revoked_at: None,
            revoked_reason: None,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        session.events.push(UsersEvent::SessionCreated(SessionCreated {
            session_id: session.id,
            user_id,
            device_type: session.device_type.as_str().to_string(),
            ip_address: session.ip_address.clone(),
        }));
        session
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }

    pub fn update_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Rotate the refresh token and extend the session
    pub fn update_refresh_token(
        &mut self,
        refresh_token_hash: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.refresh_token_hash = refresh_token_hash;
        self.expires_at = expires_at;
        self.last_activity_at = now;
    }

    /// Revoke once; later calls keep the first reason
    pub fn revoke(&mut self, reason: &str, now: DateTime<Utc>) {
        if self.is_revoked() {
            return;
        }
        self.revoked_at = Some(now);
        self.revoked_reason = Some(reason.to_string());
        self.events.push(UsersEvent::SessionRevoked(SessionRevoked {
            session_id: self.id,
            user_id: self.user_id,
            reason: Some(reason.to_string()),
        }));
    }

    pub(crate) fn take_events(&mut self) -> Vec<UsersEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>) -> Session {
        let device = SessionDevice {
            device_type: DeviceType::Mobile,
            ip_address: Some("203.0.113.7".into()),
            ..Default::default()
        };
        Session::create(UserId::new(), "hash".into(), device, now + Duration::days(7), now)
    }

    #[test]
    fn test_create_raises_event() {
        let mut s = session(Utc::now());
        let events = s.take_events();
        assert!(matches!(
            &events[..],
            [UsersEvent::SessionCreated(e)] if e.device_type == "Mobile" && e.ip_address.as_deref() == Some("203.0.113.7")
        ));
    }

    #[test]
    fn test_validity() {
        let now = Utc::now();
        let s = session(now);
        assert!(s.is_valid(now));
        assert!(s.is_expired(now + Duration::days(7)));
        assert!(!s.is_valid(now + Duration::days(8)));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let now = Utc::now();
        let mut s = session(now);
        s.take_events();
        s.revoke(REVOKED_BY_LOGOUT, now);
        s.revoke(REVOKED_BY_USER, now + Duration::minutes(1));
        assert_eq!(s.revoked_reason.as_deref(), Some(REVOKED_BY_LOGOUT));
        assert_eq!(s.revoked_at, Some(now));
        assert!(!s.is_valid(now));
        assert_eq!(s.take_events().len(), 1);
    }

    #[test]
    fn test_rotation_extends_expiry() {
        let now = Utc::now();
        let mut s = session(now);
        let later = now + Duration::days(3);
        s.update_refresh_token("next".into(), later + Duration::days(7), later);
        assert_eq!(s.refresh_token_hash, "next");
        assert_eq!(s.expires_at, later + Duration::days(7));
        assert_eq!(s.last_activity_at, later);
    }
}
