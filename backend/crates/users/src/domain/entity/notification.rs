//! Notification Entity

use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};
use uuid::Uuid;

use crate::domain::event::{NotificationRead, UsersEvent};
use crate::domain::value_object::enums::{NotificationType, ReferenceType};
use crate::error::{UsersResult, Validator};

pub const TITLE_MAX_LENGTH: usize = 200;
pub const MESSAGE_MAX_LENGTH: usize = 2000;
pub const ACTION_URL_MAX_LENGTH: usize = 500;

/// Input for a new notification
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub action_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub(crate) events: Vec<UsersEvent>,
}

impl Notification {
    pub fn create(user_id: UserId, input: NewNotification, now: DateTime<Utc>) -> UsersResult<Self> {
        let mut v = Validator::new();
        let title = v.required("title", "Title", &input.title, TITLE_MAX_LENGTH);
        let message = v.required("message", "Message", &input.message, MESSAGE_MAX_LENGTH);
        let action_url = v.optional(
            "actionUrl",
            "Action URL",
            input.action_url.as_deref(),
            ACTION_URL_MAX_LENGTH,
        );
        v.finish()?;

        Ok(Self {
            id: NotificationId::new(),
            user_id,
            title,
            message,
            notification_type: input.notification_type,
            reference_type: input.reference_type,
            reference_id: input.reference_id,
            action_url,
            read_at: None,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        })
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Returns false when it was already read
    pub fn mark_as_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_read() {
            return false;
        }
        self.read_at = Some(now);
        self.events.push(UsersEvent::NotificationRead(NotificationRead {
            notification_id: self.id,
            user_id: self.user_id,
        }));
        true
    }

    pub fn mark_as_unread(&mut self) {
        self.read_at = None;
    }

    pub(crate) fn take_events(&mut self) -> Vec<UsersEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn welcome() -> Notification {
        Notification::create(
            UserId::new(),
            NewNotification {
                title: "Welcome".into(),
                message: "Hello".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_title_and_message_required() {
        let result = Notification::create(UserId::new(), NewNotification::default(), Utc::now());
        let Err(crate::error::UsersError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_mark_as_read_is_idempotent() {
        let mut n = welcome();
        let now = Utc::now();
        assert!(n.mark_as_read(now));
        assert!(!n.mark_as_read(now));
        assert_eq!(n.read_at, Some(now));
        assert_eq!(n.take_events().len(), 1);

        n.mark_as_unread();
        assert!(!n.is_read());
    }
}
