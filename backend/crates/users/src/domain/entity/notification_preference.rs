//! Notification Preference Entity
//!
//! Channel switches (email, push, sms) and per-topic opt-ins. One row per user,
//! created with defaults the first time it is read.

use chrono::{DateTime, Utc};
use kernel::id::{NotificationPreferenceId, UserId};

use crate::domain::value_object::enums::NotificationType;

/// Partial preference update; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceChanges {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub order_updates: Option<bool>,
    pub promotions: Option<bool>,
    pub price_drops: Option<bool>,
    pub back_in_stock: Option<bool>,
    pub newsletter: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NotificationPreference {
    pub id: NotificationPreferenceId,
    pub user_id: UserId,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub order_updates: bool,
    pub promotions: bool,
    pub price_drops: bool,
    pub back_in_stock: bool,
    pub newsletter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    pub fn defaults(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationPreferenceId::new(),
            user_id,
            email_enabled: true,
            push_enabled: true,
            sms_enabled: false,
            order_updates: true,
            promotions: true,
            price_drops: true,
            back_in_stock: true,
            newsletter: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, changes: PreferenceChanges) {
        let apply = |field: &mut bool, value: Option<bool>| {
            if let Some(value) = value {
                *field = value;
            }
        };
        apply(&mut self.email_enabled, changes.email_enabled);
        apply(&mut self.push_enabled, changes.push_enabled);
        apply(&mut self.sms_enabled, changes.sms_enabled);
        apply(&mut self.order_updates, changes.order_updates);
        apply(&mut self.promotions, changes.promotions);
        apply(&mut self.price_drops, changes.price_drops);
        apply(&mut self.back_in_stock, changes.back_in_stock);
        apply(&mut self.newsletter, changes.newsletter);
    }

    pub fn enable_all_channels(&mut self) {
        self.set_channels(true);
    }

    pub fn disable_all_channels(&mut self) {
        self.set_channels(false);
    }

    pub fn enable_all_notifications(&mut self) {
        self.set_topics(true);
    }

    pub fn disable_all_notifications(&mut self) {
        self.set_topics(false);
    }

    /// Whether the user opted in to this kind of notification.
    /// Transactional and security notices are always allowed.
    pub fn allows(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::OrderUpdate => self.order_updates,
            NotificationType::Promotion | NotificationType::AbandonedCart => self.promotions,
            NotificationType::PriceDrop => self.price_drops,
            NotificationType::BackInStock => self.back_in_stock,
            NotificationType::Newsletter => self.newsletter,
            NotificationType::Info
            | NotificationType::ProductReview
            | NotificationType::SecurityAlert
            | NotificationType::AccountUpdate => true,
        }
    }

    pub fn can_receive_email(&self, notification_type: NotificationType) -> bool {
        self.email_enabled && self.allows(notification_type)
    }

    pub fn can_receive_push(&self, notification_type: NotificationType) -> bool {
        self.push_enabled && self.allows(notification_type)
    }

    pub fn can_receive_sms(&self, notification_type: NotificationType) -> bool {
        self.sms_enabled && self.allows(notification_type)
    }

    fn set_channels(&mut self, enabled: bool) {
        self.email_enabled = enabled;
        self.push_enabled = enabled;
        self.sms_enabled = enabled;
    }

    fn set_topics(&mut self, enabled: bool) {
        self.order_updates = enabled;
        self.promotions = enabled;
        self.price_drops = enabled;
        self.back_in_stock = enabled;
        self.newsletter = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = NotificationPreference::defaults(UserId::new(), Utc::now());
        assert!(p.email_enabled && p.push_enabled && !p.sms_enabled);
        assert!(p.order_updates && p.promotions && p.price_drops && p.back_in_stock);
        assert!(!p.newsletter);
    }

    #[test]
    fn test_partial_update() {
        let mut p = NotificationPreference::defaults(UserId::new(), Utc::now());
        p.update(PreferenceChanges {
            sms_enabled: Some(true),
            promotions: Some(false),
            ..Default::default()
        });
        assert!(p.sms_enabled);
        assert!(!p.promotions);
        assert!(p.email_enabled);
    }

    #[test]
    fn test_channel_and_topic_gates() {
        let mut p = NotificationPreference::defaults(UserId::new(), Utc::now());
        assert!(!p.can_receive_email(NotificationType::Newsletter));
        assert!(p.can_receive_email(NotificationType::PriceDrop));
        assert!(!p.can_receive_sms(NotificationType::SecurityAlert));

        p.disable_all_notifications();
        assert!(!p.can_receive_push(NotificationType::OrderUpdate));
        assert!(p.can_receive_push(NotificationType::SecurityAlert));

        p.disable_all_channels();
        assert!(!p.can_receive_email(NotificationType::SecurityAlert));

        p.enable_all_channels();
        p.enable_all_notifications();
        assert!(p.can_receive_sms(NotificationType::Newsletter));
    }
}
