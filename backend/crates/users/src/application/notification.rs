//! Notification Use Cases

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{NotificationId, UserId};
use kernel::pagination::{Page, PageRequest};

use crate::domain::change_set::ChangeSet;
use crate::domain::entity::Notification;
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Notification use cases
pub struct NotificationUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
}

impl<R> NotificationUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Newest first
    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageRequest,
    ) -> UsersResult<Page<Notification>> {
        let (items, total) = self
            .repo
            .list_notifications(user_id, unread_only, page)
            .await?;
        Ok(Page::new(items, page, total))
    }

    pub async fn unread_count(&self, user_id: UserId) -> UsersResult<u64> {
        self.repo.count_unread(user_id).await
    }

    pub async fn mark_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> UsersResult<()> {
        let now = Utc::now();
        let mut notification = self.owned(user_id, notification_id).await?;
        if !notification.mark_as_read(now) {
            return Ok(());
        }

        let mut changes = ChangeSet::new(now);
        changes.update(notification);
        self.repo.commit(changes).await
    }

    pub async fn mark_unread(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> UsersResult<()> {
        let now = Utc::now();
        let mut notification = self.owned(user_id, notification_id).await?;
        if !notification.is_read() {
            return Ok(());
        }
        notification.mark_as_unread();

        let mut changes = ChangeSet::new(now);
        changes.update(notification);
        self.repo.commit(changes).await
    }

    /// Returns how many notifications changed state
    pub async fn mark_all_read(&self, user_id: UserId) -> UsersResult<usize> {
        let now = Utc::now();
        let mut changes = ChangeSet::new(now);
        let mut marked = 0;
        for mut notification in self.repo.list_unread_notifications(user_id).await? {
            if notification.mark_as_read(now) {
                changes.update(notification);
                marked += 1;
            }
        }
        if marked > 0 {
            self.repo.commit(changes).await?;
        }

        tracing::debug!(user_id = %user_id, marked, "Notifications marked as read");
        Ok(marked)
    }

    async fn owned(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> UsersResult<Notification> {
        let notification = self
            .repo
            .find_notification(notification_id)
            .await?
            .ok_or(UsersError::NotificationNotFound)?;
        if notification.user_id != user_id {
            return Err(UsersError::NotificationNotFound);
        }
        Ok(notification)
    }
}
