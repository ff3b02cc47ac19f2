//! Repository Traits
//!
//! Reads go through the per-aggregate repositories; every write goes through
//! `UsersUnitOfWork::commit` so that state changes and their outbox messages
//! land in one transaction. Soft-deleted rows are never returned.

use chrono::{DateTime, Utc};
use kernel::id::{AddressId, NotificationId, SessionId, UserId};
use kernel::pagination::PageRequest;

use crate::domain::change_set::ChangeSet;
use crate::domain::entity::{
    Address, LoginHistory, Notification, NotificationPreference, Profile, Session, User,
};
use crate::domain::value_object::{cpf::Cpf, email::Email};
use crate::error::UsersResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    async fn find_user_by_id(&self, user_id: UserId) -> UsersResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> UsersResult<Option<User>>;

    async fn email_exists(&self, email: &Email) -> UsersResult<bool>;
}

/// Profile repository trait
#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    async fn find_profile_by_user(&self, user_id: UserId) -> UsersResult<Option<Profile>>;

    /// Whether another user's active profile already holds this CPF
    async fn cpf_exists(&self, cpf: &Cpf, exclude_user: Option<UserId>) -> UsersResult<bool>;
}

/// Address repository trait
#[trait_variant::make(AddressRepository: Send)]
pub trait LocalAddressRepository {
    /// Active addresses, default first, then oldest first
    async fn list_addresses(&self, user_id: UserId) -> UsersResult<Vec<Address>>;

    async fn find_address(&self, address_id: AddressId) -> UsersResult<Option<Address>>;

    async fn count_active_addresses(&self, user_id: UserId) -> UsersResult<u64>;
}

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn find_session(&self, session_id: SessionId) -> UsersResult<Option<Session>>;

    async fn find_session_by_refresh_hash(&self, hash: &str) -> UsersResult<Option<Session>>;

    /// Unrevoked, unexpired sessions, most recently active first
    async fn list_active_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> UsersResult<Vec<Session>>;

    /// Physically delete sessions that expired or were revoked before `cutoff`
    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> UsersResult<u64>;
}

/// Login history repository trait
#[trait_variant::make(LoginHistoryRepository: Send)]
pub trait LocalLoginHistoryRepository {
    /// Newest first
    async fn recent_logins(&self, user_id: UserId, limit: u32) -> UsersResult<Vec<LoginHistory>>;
}

/// Notification repository trait
#[trait_variant::make(NotificationRepository: Send)]
pub trait LocalNotificationRepository {
    /// One page, newest first, plus the total matching count
    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageRequest,
    ) -> UsersResult<(Vec<Notification>, u64)>;

    async fn list_unread_notifications(&self, user_id: UserId) -> UsersResult<Vec<Notification>>;

    async fn count_unread(&self, user_id: UserId) -> UsersResult<u64>;

    async fn find_notification(
        &self,
        notification_id: NotificationId,
    ) -> UsersResult<Option<Notification>>;
}

/// Notification preference repository trait
#[trait_variant::make(NotificationPreferenceRepository: Send)]
pub trait LocalNotificationPreferenceRepository {
    async fn find_preferences(&self, user_id: UserId)
    -> UsersResult<Option<NotificationPreference>>;
}

/// Transactional write side
#[trait_variant::make(UsersUnitOfWork: Send)]
pub trait LocalUsersUnitOfWork {
    /// Apply every staged write and outbox message atomically.
    ///
    /// Fails with `ConcurrencyConflict` when a staged profile was changed
    /// by someone else since it was loaded.
    async fn commit(&self, changes: ChangeSet) -> UsersResult<()>;
}

/// Everything the use cases need from storage
pub trait UsersStore:
    UserRepository
    + ProfileRepository
    + AddressRepository
    + SessionRepository
    + LoginHistoryRepository
    + NotificationRepository
    + NotificationPreferenceRepository
    + UsersUnitOfWork
    + Send
    + Sync
    + 'static
{
}

impl<T> UsersStore for T where
    T: UserRepository
        + ProfileRepository
        + AddressRepository
        + SessionRepository
        + LoginHistoryRepository
        + NotificationRepository
        + NotificationPreferenceRepository
        + UsersUnitOfWork
        + Send
        + Sync
        + 'static
{
}
