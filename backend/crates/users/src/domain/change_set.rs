//! Change Set
//!
//! Writes staged by a use case and applied by `UsersUnitOfWork::commit`
//! in a single transaction. Staging an aggregate drains its pending domain
//! events into the set, stamps `updated_at` on updates and turns deletes
//! into soft deletes.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    Address, LoginHistory, Notification, NotificationPreference, Profile, Session, User,
};
use crate::domain::event::UsersEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Insert,
    Update,
}

/// An entity the unit of work knows how to persist
pub trait Aggregate: Sized {
    fn drain_events(&mut self) -> Vec<UsersEvent>;

    /// Audit stamp applied to updates
    fn touch(&mut self, now: DateTime<Utc>);

    fn stage(self, op: Op, changes: &mut ChangeSet);
}

/// Aggregates that are never physically deleted
pub trait SoftDelete: Aggregate {
    fn mark_deleted(&mut self, now: DateTime<Utc>);
}

#[derive(Debug)]
pub struct ChangeSet {
    now: DateTime<Utc>,
    users: Vec<(Op, User)>,
    profiles: Vec<(Op, Profile)>,
    preferences: Vec<(Op, NotificationPreference)>,
    addresses: Vec<(Op, Address)>,
    sessions: Vec<(Op, Session)>,
    login_history: Vec<LoginHistory>,
    notifications: Vec<(Op, Notification)>,
    events: Vec<UsersEvent>,
}

impl ChangeSet {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            users: Vec::new(),
            profiles: Vec::new(),
            preferences: Vec::new(),
            addresses: Vec::new(),
            sessions: Vec::new(),
            login_history: Vec::new(),
            notifications: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Time the changes are recorded at
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn insert<A: Aggregate>(&mut self, mut aggregate: A) -> &mut Self {
        self.events.extend(aggregate.drain_events());
        aggregate.stage(Op::Insert, self);
        self
    }

    pub fn update<A: Aggregate>(&mut self, mut aggregate: A) -> &mut Self {
        aggregate.touch(self.now);
        self.events.extend(aggregate.drain_events());
        aggregate.stage(Op::Update, self);
        self
    }

    /// Soft delete: stamps `deleted_at` and stages an update
    pub fn delete<A: SoftDelete>(&mut self, mut aggregate: A) -> &mut Self {
        aggregate.mark_deleted(self.now);
        self.update(aggregate)
    }

    /// Publish an event not raised by a staged aggregate
    pub fn publish(&mut self, event: UsersEvent) -> &mut Self {
        self.events.push(event);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.profiles.is_empty()
            && self.preferences.is_empty()
            && self.addresses.is_empty()
            && self.sessions.is_empty()
            && self.login_history.is_empty()
            && self.notifications.is_empty()
            && self.events.is_empty()
    }

    pub fn users(&self) -> &[(Op, User)] {
        &self.users
    }

    pub fn profiles(&self) -> &[(Op, Profile)] {
        &self.profiles
    }

    pub fn preferences(&self) -> &[(Op, NotificationPreference)] {
        &self.preferences
    }

    pub fn addresses(&self) -> &[(Op, Address)] {
        &self.addresses
    }

    pub fn sessions(&self) -> &[(Op, Session)] {
        &self.sessions
    }

    pub fn login_history(&self) -> &[LoginHistory] {
        &self.login_history
    }

    pub fn notifications(&self) -> &[(Op, Notification)] {
        &self.notifications
    }

    pub fn events(&self) -> &[UsersEvent] {
        &self.events
    }
}

impl Aggregate for User {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        self.take_events()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.users.push((op, self));
    }
}

impl SoftDelete for User {
    fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.soft_delete(now);
    }
}

impl Aggregate for Profile {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        self.take_events()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.profiles.push((op, self));
    }
}

impl SoftDelete for Profile {
    fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.soft_delete(now);
    }
}

impl Aggregate for Address {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        self.take_events()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.addresses.push((op, self));
    }
}

impl SoftDelete for Address {
    fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.soft_delete(now);
    }
}

impl Aggregate for Session {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        self.take_events()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.sessions.push((op, self));
    }
}

impl Aggregate for Notification {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        self.take_events()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.notifications.push((op, self));
    }
}

impl Aggregate for NotificationPreference {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        Vec::new()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stage(self, op: Op, changes: &mut ChangeSet) {
        changes.preferences.push((op, self));
    }
}

impl Aggregate for LoginHistory {
    fn drain_events(&mut self) -> Vec<UsersEvent> {
        Vec::new()
    }

    // Append-only
    fn touch(&mut self, _now: DateTime<Utc>) {}

    fn stage(self, _op: Op, changes: &mut ChangeSet) {
        changes.login_history.push(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::AddressDraft;
    use chrono::Duration;
    use kernel::id::UserId;

    #[test]
    fn test_insert_drains_events() {
        let now = Utc::now();
        let profile = Profile::create(UserId::new(), "Ana", "Souza", now).unwrap();

        let mut changes = ChangeSet::new(now);
        changes.insert(profile);

        assert_eq!(changes.profiles().len(), 1);
        assert!(changes.profiles()[0].1.events.is_empty());
        assert!(matches!(changes.events(), [UsersEvent::ProfileCreated(_)]));
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let created = Utc::now() - Duration::days(1);
        let now = Utc::now();
        let prefs = NotificationPreference::defaults(UserId::new(), created);

        let mut changes = ChangeSet::new(now);
        changes.update(prefs);

        let (op, staged) = &changes.preferences()[0];
        assert_eq!(*op, Op::Update);
        assert_eq!(staged.updated_at, now);
        assert_eq!(staged.created_at, created);
    }

    #[test]
    fn test_delete_is_soft() {
        let now = Utc::now();
        let draft = AddressDraft {
            street: "Rua A".into(),
            city: "Recife".into(),
            state: "PE".into(),
            postal_code: "50000-000".into(),
            ..Default::default()
        };
        let mut address = Address::create(UserId::new(), &draft, true, now).unwrap();
        address.take_events();

        let mut changes = ChangeSet::new(now);
        changes.delete(address);

        let (op, staged) = &changes.addresses()[0];
        assert_eq!(*op, Op::Update);
        assert_eq!(staged.deleted_at, Some(now));
        assert!(!staged.is_default);
        assert!(matches!(changes.events(), [UsersEvent::AddressDeleted(_)]));
    }

    #[test]
    fn test_publish_and_is_empty() {
        let mut changes = ChangeSet::new(Utc::now());
        assert!(changes.is_empty());
        changes.publish(UsersEvent::PasswordChanged(crate::domain::event::PasswordChanged {
            user_id: UserId::new(),
        }));
        assert!(!changes.is_empty());
    }
}
