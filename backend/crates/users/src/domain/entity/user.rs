//! User Entity
//!
//! Identity and credentials. Personal data lives in `Profile`.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use platform::crypto::{random_bytes, to_base64_url};
use platform::password::HashedPassword;

use crate::domain::event::{EmailConfirmed, PasswordChanged, UsersEvent};
use crate::domain::value_object::email::Email;
use crate::domain::value_object::role::Role;
use crate::error::{UsersError, UsersResult};

/// Failed logins before the account is locked
pub const MAX_FAILED_LOGIN_ATTEMPTS: u32 = 5;

/// Lockout duration in minutes
pub const LOCKOUT_MINUTES: i64 = 15;

const SECURITY_STAMP_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Normalized lowercase email (login name)
    pub email: Email,
    pub email_confirmed: bool,
    pub password_hash: HashedPassword,
    /// Rotated whenever credentials change; invalidates signed tokens
    pub security_stamp: String,
    pub roles: Vec<Role>,
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub(crate) events: Vec<UsersEvent>,
}

impl User {
    /// Register a new customer account
    pub fn register(email: Email, password_hash: HashedPassword, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email,
            email_confirmed: false,
            password_hash,
            security_stamp: new_security_stamp(),
            roles: vec![Role::Customer],
            failed_login_count: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            events: Vec::new(),
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Count a failed password check. Returns true when this attempt locked the account.
    pub fn record_failed_login(&mut self, now: DateTime<Utc>) -> bool {
        // An expired lock starts a fresh window
        if self.locked_until.is_some_and(|until| until <= now) {
            self.locked_until = None;
            self.failed_login_count = 0;
        }

        self.failed_login_count += 1;
        if self.failed_login_count >= MAX_FAILED_LOGIN_ATTEMPTS {
            self.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
            self.failed_login_count = 0;
            return true;
        }
        false
    }

    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_count = 0;
        self.locked_until = None;
        self.last_login_at = Some(now);
    }

    pub fn confirm_email(&mut self) -> UsersResult<()> {
        if self.email_confirmed {
            return Err(UsersError::EmailAlreadyConfirmed);
        }
        self.email_confirmed = true;
        self.events
            .push(UsersEvent::EmailConfirmed(EmailConfirmed { user_id: self.id }));
        Ok(())
    }

    /// Replace the password after a change or reset
    pub fn change_password(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.rotate_security_stamp();
        self.failed_login_count = 0;
        self.locked_until = None;
        self.events
            .push(UsersEvent::PasswordChanged(PasswordChanged { user_id: self.id }));
    }

    /// Upgrade the stored hash to the current work factor
    pub fn rehash_password(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
    }

    pub fn rotate_security_stamp(&mut self) {
        self.security_stamp = new_security_stamp();
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn add_role(&mut self, role: Role) -> UsersResult<()> {
        if self.has_role(role) {
            return Err(UsersError::RoleAlreadyAssigned(role.code().to_string()));
        }
        self.roles.push(role);
        self.roles.sort();
        self.rotate_security_stamp();
        Ok(())
    }

    pub fn remove_role(&mut self, role: Role) -> UsersResult<()> {
        if !self.has_role(role) {
            return Err(UsersError::RoleNotAssigned(role.code().to_string()));
        }
        if self.roles.len() == 1 {
            return Err(UsersError::CannotRemoveLastRole);
        }
        self.roles.retain(|r| *r != role);
        self.rotate_security_stamp();
        Ok(())
    }

    pub fn role_codes(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.code().to_string()).collect()
    }

    /// Effective permissions of every assigned role
    pub fn permissions(&self) -> Vec<String> {
        Role::permissions_for(&self.roles)
    }

    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(now);
            self.rotate_security_stamp();
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<UsersEvent> {
        std::mem::take(&mut self.events)
    }
}

fn new_security_stamp() -> String {
    to_base64_url(&random_bytes(SECURITY_STAMP_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::ClearTextPassword;

    fn user(now: DateTime<Utc>) -> User {
        let hash = ClearTextPassword::for_verification("Str0ng!Pass".into()).hash_with_iterations(1_000);
        User::register(Email::new("ana@example.com").unwrap(), hash, now)
    }

    #[test]
    fn test_register_defaults() {
        let now = Utc::now();
        let user = user(now);
        assert_eq!(user.roles, vec![Role::Customer]);
        assert!(!user.email_confirmed);
        assert!(!user.security_stamp.is_empty());
        assert!(!user.is_locked(now));
        assert!(user.events.is_empty());
    }

    #[test]
    fn test_lockout_after_five_failures() {
        let now = Utc::now();
        let mut user = user(now);

        for _ in 0..4 {
            assert!(!user.record_failed_login(now));
        }
        assert!(!user.is_locked(now));

        assert!(user.record_failed_login(now));
        assert!(user.is_locked(now));
        assert!(user.is_locked(now + Duration::minutes(14)));
        assert!(!user.is_locked(now + Duration::minutes(15)));
    }

    #[test]
    fn test_expired_lock_starts_new_window() {
        let now = Utc::now();
        let mut user = user(now);
        for _ in 0..5 {
            user.record_failed_login(now);
        }
        let later = now + Duration::minutes(20);
        assert!(!user.record_failed_login(later));
        assert_eq!(user.failed_login_count, 1);
        assert!(user.locked_until.is_none());
    }

    #[test]
    fn test_successful_login_resets_counter() {
        let now = Utc::now();
        let mut user = user(now);
        user.record_failed_login(now);
        user.record_failed_login(now);
        user.record_successful_login(now);
        assert_eq!(user.failed_login_count, 0);
        assert_eq!(user.last_login_at, Some(now));
    }

    #[test]
    fn test_confirm_email_once() {
        let mut user = user(Utc::now());
        user.confirm_email().unwrap();
        assert!(user.email_confirmed);
        assert!(matches!(user.confirm_email(), Err(UsersError::EmailAlreadyConfirmed)));
        assert_eq!(user.take_events().len(), 1);
        assert!(user.take_events().is_empty());
    }

    #[test]
    fn test_change_password_rotates_stamp() {
        let mut user = user(Utc::now());
        let stamp = user.security_stamp.clone();
        let new_hash = ClearTextPassword::for_verification("0ther!Pass".into()).hash_with_iterations(1_000);
        user.change_password(new_hash);
        assert_ne!(user.security_stamp, stamp);
        assert!(matches!(user.events[0], UsersEvent::PasswordChanged(_)));
    }

    #[test]
    fn test_role_management() {
        let mut user = user(Utc::now());
        user.add_role(Role::Seller).unwrap();
        assert!(matches!(
            user.add_role(Role::Seller),
            Err(UsersError::RoleAlreadyAssigned(_))
        ));
        assert!(user.permissions().iter().any(|p| p == "catalog:create_product"));

        user.remove_role(Role::Customer).unwrap();
        assert!(matches!(
            user.remove_role(Role::Admin),
            Err(UsersError::RoleNotAssigned(_))
        ));
        assert!(matches!(
            user.remove_role(Role::Seller),
            Err(UsersError::CannotRemoveLastRole)
        ));
    }
}
