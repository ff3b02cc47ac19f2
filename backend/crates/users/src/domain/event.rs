//! Domain events raised by the users aggregates
//!
//! Aggregates buffer events while they are mutated; the unit of work drains
//! them and writes them to the outbox in the same transaction.

use chrono::{DateTime, Utc};
use kernel::id::{AddressId, NotificationId, ProfileId, SessionId, UserId};
use outbox::{OutboxEvent, OutboxMessage, OutboxResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistered {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

impl OutboxEvent for UserRegistered {
    const EVENT_TYPE: &'static str = "users.user_registered";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfirmed {
    pub user_id: UserId,
}

impl OutboxEvent for EmailConfirmed {
    const EVENT_TYPE: &'static str = "users.email_confirmed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChanged {
    pub user_id: UserId,
}

impl OutboxEvent for PasswordChanged {
    const EVENT_TYPE: &'static str = "users.password_changed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCreated {
    pub profile_id: ProfileId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
}

impl OutboxEvent for ProfileCreated {
    const EVENT_TYPE: &'static str = "users.profile_created";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdated {
    pub profile_id: ProfileId,
    pub user_id: UserId,
    pub version: i32,
}

impl OutboxEvent for ProfileUpdated {
    const EVENT_TYPE: &'static str = "users.profile_updated";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDeleted {
    pub profile_id: ProfileId,
    pub user_id: UserId,
}

impl OutboxEvent for ProfileDeleted {
    const EVENT_TYPE: &'static str = "users.profile_deleted";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCreated {
    pub address_id: AddressId,
    pub user_id: UserId,
    pub is_default: bool,
}

impl OutboxEvent for AddressCreated {
    const EVENT_TYPE: &'static str = "users.address_created";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdated {
    pub address_id: AddressId,
    pub user_id: UserId,
}

impl OutboxEvent for AddressUpdated {
    const EVENT_TYPE: &'static str = "users.address_updated";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSetAsDefault {
    pub address_id: AddressId,
    pub user_id: UserId,
}

impl OutboxEvent for AddressSetAsDefault {
    const EVENT_TYPE: &'static str = "users.address_set_as_default";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDeleted {
    pub address_id: AddressId,
    pub user_id: UserId,
}

impl OutboxEvent for AddressDeleted {
    const EVENT_TYPE: &'static str = "users.address_deleted";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub device_type: String,
    pub ip_address: Option<String>,
}

impl OutboxEvent for SessionCreated {
    const EVENT_TYPE: &'static str = "users.session_created";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRevoked {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub reason: Option<String>,
}

impl OutboxEvent for SessionRevoked {
    const EVENT_TYPE: &'static str = "users.session_revoked";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRead {
    pub notification_id: NotificationId,
    pub user_id: UserId,
}

impl OutboxEvent for NotificationRead {
    const EVENT_TYPE: &'static str = "users.notification_read";
}

/// Every event the users module publishes
#[derive(Debug, Clone, PartialEq)]
pub enum UsersEvent {
    UserRegistered(UserRegistered),
    EmailConfirmed(EmailConfirmed),
    PasswordChanged(PasswordChanged),
    ProfileCreated(ProfileCreated),
    ProfileUpdated(ProfileUpdated),
    ProfileDeleted(ProfileDeleted),
    AddressCreated(AddressCreated),
    AddressUpdated(AddressUpdated),
    AddressSetAsDefault(AddressSetAsDefault),
    AddressDeleted(AddressDeleted),
    SessionCreated(SessionCreated),
    SessionRevoked(SessionRevoked),
    NotificationRead(NotificationRead),
}

impl UsersEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UsersEvent::UserRegistered(_) => UserRegistered::EVENT_TYPE,
            UsersEvent::EmailConfirmed(_) => EmailConfirmed::EVENT_TYPE,
            UsersEvent::PasswordChanged(_) => PasswordChanged::EVENT_TYPE,
            UsersEvent::ProfileCreated(_) => ProfileCreated::EVENT_TYPE,
            UsersEvent::ProfileUpdated(_) => ProfileUpdated::EVENT_TYPE,
            UsersEvent::ProfileDeleted(_) => ProfileDeleted::EVENT_TYPE,
            UsersEvent::AddressCreated(_) => AddressCreated::EVENT_TYPE,
            UsersEvent::AddressUpdated(_) => AddressUpdated::EVENT_TYPE,
            UsersEvent::AddressSetAsDefault(_) => AddressSetAsDefault::EVENT_TYPE,
            UsersEvent::AddressDeleted(_) => AddressDeleted::EVENT_TYPE,
            UsersEvent::SessionCreated(_) => SessionCreated::EVENT_TYPE,
            UsersEvent::SessionRevoked(_) => SessionRevoked::EVENT_TYPE,
            UsersEvent::NotificationRead(_) => NotificationRead::EVENT_TYPE,
        }
    }

    pub fn to_outbox_message(&self, occurred_at: DateTime<Utc>) -> OutboxResult<OutboxMessage> {
        match self {
            UsersEvent::UserRegistered(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::EmailConfirmed(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::PasswordChanged(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::ProfileCreated(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::ProfileUpdated(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::ProfileDeleted(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::AddressCreated(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::AddressUpdated(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::AddressSetAsDefault(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::AddressDeleted(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::SessionCreated(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::SessionRevoked(e) => OutboxMessage::from_event(e, occurred_at),
            UsersEvent::NotificationRead(e) => OutboxMessage::from_event(e, occurred_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_message_carries_type_and_payload() {
        let user_id = UserId::new();
        let event = UsersEvent::UserRegistered(UserRegistered {
            user_id,
            email: "ana@example.com".to_string(),
            name: "Ana Souza".to_string(),
        });

        let message = event.to_outbox_message(Utc::now()).unwrap();
        assert_eq!(message.event_type, "users.user_registered");
        assert_eq!(message.payload["userId"], user_id.to_string());
        assert_eq!(message.payload["name"], "Ana Souza");
    }

    #[test]
    fn test_event_types_are_unique() {
        let mut types = vec![
            UserRegistered::EVENT_TYPE,
            EmailConfirmed::EVENT_TYPE,
            PasswordChanged::EVENT_TYPE,
            ProfileCreated::EVENT_TYPE,
            ProfileUpdated::EVENT_TYPE,
            ProfileDeleted::EVENT_TYPE,
            AddressCreated::EVENT_TYPE,
            AddressUpdated::EVENT_TYPE,
            AddressSetAsDefault::EVENT_TYPE,
            AddressDeleted::EVENT_TYPE,
            SessionCreated::EVENT_TYPE,
            SessionRevoked::EVENT_TYPE,
            NotificationRead::EVENT_TYPE,
        ];
        let total = types.len();
        types.sort_unstable();
        types.dedup();
        assert_eq!(types.len(), total);
    }
}
