//! Email Confirmation Use Cases

use std::sync::Arc;

use chrono::Utc;
use platform::token::TokenPurpose;

use crate::application::config::UsersConfig;
use crate::application::email::AccountMailer;
use crate::application::tokens::user_for_signed_token;
use crate::domain::change_set::ChangeSet;
use crate::domain::repository::UsersStore;
use crate::domain::value_object::email::Email;
use crate::error::{UsersError, UsersResult};

/// Confirm email use case
pub struct ConfirmEmailUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> ConfirmEmailUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, token: &str) -> UsersResult<()> {
        let now = Utc::now();
        let mut user = user_for_signed_token(
            self.repo.as_ref(),
            &self.config.token_secret,
            TokenPurpose::EmailConfirmation,
            token,
            now,
        )
        .await?;

        user.confirm_email()?;
        let user_id = user.id;

        let mut changes = ChangeSet::new(now);
        changes.update(user);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, "Email confirmed");
        Ok(())
    }
}

/// Resend confirmation use case
pub struct ResendConfirmationUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    mailer: AccountMailer,
}

impl<R> ResendConfirmationUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, mailer: AccountMailer) -> Self {
        Self { repo, mailer }
    }

    /// Unknown addresses succeed silently
    pub async fn execute(&self, email: &str) -> UsersResult<()> {
        let Ok(email) = Email::new(email) else {
            return Ok(());
        };
        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            tracing::debug!(email = %email.masked(), "Confirmation resend for unknown email");
            return Ok(());
        };
        if user.email_confirmed {
            return Err(UsersError::EmailAlreadyConfirmed);
        }

        let name = match self.repo.find_profile_by_user(user.id).await? {
            Some(profile) => profile.full_name(),
            None => user.email.local_part().to_string(),
        };

        self.mailer
            .send_confirmation(&user, &name, Utc::now())
            .await
            .map_err(|e| UsersError::Internal(format!("{e:#}")))?;

        tracing::info!(user_id = %user.id, "Confirmation email resent");
        Ok(())
    }
}
