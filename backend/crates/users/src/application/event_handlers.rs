//! Outbox consumers for the users events
//!
//! Delivery is at-least-once: a retried message runs its handlers again.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use outbox::{EventHandler, HandlerRegistry, OutboxEvent};

use crate::application::email::AccountMailer;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::{NewNotification, Notification};
use crate::domain::event::{
    AddressCreated, AddressDeleted, AddressSetAsDefault, AddressUpdated, EmailConfirmed,
    NotificationRead, PasswordChanged, ProfileCreated, ProfileDeleted, ProfileUpdated,
    SessionCreated, SessionRevoked, UserRegistered, UsersEvent,
};
use crate::domain::repository::UsersStore;
use crate::domain::value_object::enums::{NotificationType, ReferenceType};

pub const WELCOME_TITLE: &str = "Welcome";

/// Sends the welcome notification and announces the registration
pub struct WelcomeOnProfileCreated<R: UsersStore> {
    repo: Arc<R>,
}

impl<R: UsersStore> WelcomeOnProfileCreated<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: UsersStore> EventHandler<ProfileCreated> for WelcomeOnProfileCreated<R> {
    async fn handle(&self, event: ProfileCreated) -> anyhow::Result<()> {
        let Some(user) = self.repo.find_user_by_id(event.user_id).await? else {
            tracing::warn!(user_id = %event.user_id, "Profile created for missing user; skipping welcome");
            return Ok(());
        };

        let now = Utc::now();
        let notification = Notification::create(
            event.user_id,
            NewNotification {
                title: WELCOME_TITLE.to_string(),
                message: format!(
                    "Hello {}, your account is ready. Confirm your email address to get started.",
                    event.first_name
                ),
                notification_type: NotificationType::Info,
                reference_type: ReferenceType::Account,
                reference_id: Some(event.user_id.into_uuid()),
                action_url: None,
            },
            now,
        )?;

        let mut changes = ChangeSet::new(now);
        changes
            .insert(notification)
            .publish(UsersEvent::UserRegistered(UserRegistered {
                user_id: event.user_id,
                email: user.email.as_str().to_string(),
                name: event.display_name,
            }));
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %event.user_id, "Welcome notification created");
        Ok(())
    }
}

/// Emails the confirmation link to a newly registered user
pub struct SendConfirmationOnUserRegistered<R: UsersStore> {
    repo: Arc<R>,
    mailer: AccountMailer,
}

impl<R: UsersStore> SendConfirmationOnUserRegistered<R> {
    pub fn new(repo: Arc<R>, mailer: AccountMailer) -> Self {
        Self { repo, mailer }
    }
}

#[async_trait]
impl<R: UsersStore> EventHandler<UserRegistered> for SendConfirmationOnUserRegistered<R> {
    async fn handle(&self, event: UserRegistered) -> anyhow::Result<()> {
        let Some(user) = self.repo.find_user_by_id(event.user_id).await? else {
            tracing::debug!(user_id = %event.user_id, "User gone before confirmation email");
            return Ok(());
        };
        if user.email_confirmed {
            return Ok(());
        }

        self.mailer
            .send_confirmation(&user, &event.name, Utc::now())
            .await?;
        tracing::info!(user_id = %event.user_id, "Confirmation email sent");
        Ok(())
    }
}

/// Records an event in the log and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvent;

#[async_trait]
impl<E> EventHandler<E> for LogEvent
where
    E: OutboxEvent + Debug,
{
    async fn handle(&self, event: E) -> anyhow::Result<()> {
        tracing::info!(event_type = E::EVENT_TYPE, event = ?event, "Domain event");
        Ok(())
    }
}

/// Register every users handler
pub fn register_handlers<R: UsersStore>(
    registry: &mut HandlerRegistry,
    repo: Arc<R>,
    mailer: AccountMailer,
) {
    registry
        .register::<ProfileCreated, _>(WelcomeOnProfileCreated::new(repo.clone()))
        .register::<UserRegistered, _>(SendConfirmationOnUserRegistered::new(repo, mailer))
        .register::<EmailConfirmed, _>(LogEvent)
        .register::<PasswordChanged, _>(LogEvent)
        .register::<ProfileUpdated, _>(LogEvent)
        .register::<ProfileDeleted, _>(LogEvent)
        .register::<AddressCreated, _>(LogEvent)
        .register::<AddressUpdated, _>(LogEvent)
        .register::<AddressSetAsDefault, _>(LogEvent)
        .register::<AddressDeleted, _>(LogEvent)
        .register::<SessionCreated, _>(LogEvent)
        .register::<SessionRevoked, _>(LogEvent)
        .register::<NotificationRead, _>(LogEvent);
}
