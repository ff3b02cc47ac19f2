//! Notification Preference Use Cases
//!
//! Preferences are created with defaults the first time they are read.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;

use crate::domain::change_set::ChangeSet;
use crate::domain::entity::{NotificationPreference, PreferenceChanges};
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Notification preference use cases
pub struct PreferencesUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
}

impl<R> PreferencesUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, user_id: UserId) -> UsersResult<NotificationPreference> {
        match self.repo.find_preferences(user_id).await? {
            Some(preferences) => Ok(preferences),
            None => self.create_defaults(user_id).await,
        }
    }

    pub async fn update(
        &self,
        user_id: UserId,
        changes: PreferenceChanges,
    ) -> UsersResult<NotificationPreference> {
        let mut preferences = self.get(user_id).await?;
        preferences.update(changes);
        preferences.updated_at = Utc::now();

        let mut change_set = ChangeSet::new(preferences.updated_at);
        change_set.update(preferences.clone());
        self.repo.commit(change_set).await?;

        tracing::info!(user_id = %user_id, "Notification preferences updated");
        Ok(preferences)
    }

    /// Inserts defaults and reads back whichever row won a concurrent insert.
    async fn create_defaults(&self, user_id: UserId) -> UsersResult<NotificationPreference> {
        let now = Utc::now();
        let mut changes = ChangeSet::new(now);
        changes.insert(NotificationPreference::defaults(user_id, now));
        self.repo.commit(changes).await?;
        tracing::debug!(user_id = %user_id, "Default notification preferences created");

        self.repo
            .find_preferences(user_id)
            .await?
            .ok_or(UsersError::UserNotFound)
    }
}
