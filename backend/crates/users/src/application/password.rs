//! Password Use Cases
//!
//! Forgot/reset via a signed email token, and change while signed in.
//! Every successful change rotates the security stamp, which also voids
//! outstanding confirmation and reset links.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{SessionId, UserId};
use platform::password::ClearTextPassword;
use platform::token::TokenPurpose;

use crate::application::config::UsersConfig;
use crate::application::email::AccountMailer;
use crate::application::tokens::user_for_signed_token;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::session::{REVOKED_BY_PASSWORD_CHANGE, REVOKED_BY_PASSWORD_RESET};
use crate::domain::repository::UsersStore;
use crate::domain::value_object::email::Email;
use crate::error::{UsersError, UsersResult, Validator};

fn new_password(raw: String) -> UsersResult<ClearTextPassword> {
    let violations = ClearTextPassword::policy_violations(&raw);
    if !violations.is_empty() {
        let mut v = Validator::new();
        for violation in violations {
            v.add("newPassword", violation.to_string());
        }
        v.finish()?;
    }
    ClearTextPassword::new(raw).map_err(|e| UsersError::invalid("newPassword", e.to_string()))
}

/// Forgot password use case
pub struct ForgotPasswordUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    mailer: AccountMailer,
}

impl<R> ForgotPasswordUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, mailer: AccountMailer) -> Self {
        Self { repo, mailer }
    }

    /// Always succeeds for well-formed requests so accounts cannot be probed
    pub async fn execute(&self, email: &str) -> UsersResult<()> {
        let Ok(email) = Email::new(email) else {
            return Ok(());
        };
        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            tracing::debug!(email = %email.masked(), "Password reset requested for unknown email");
            return Ok(());
        };

        if let Err(e) = self.mailer.send_password_reset(&user, Utc::now()).await {
            tracing::error!(user_id = %user.id, error = %format!("{e:#}"), "Failed to send password reset email");
            return Ok(());
        }

        tracing::info!(user_id = %user.id, "Password reset email sent");
        Ok(())
    }
}

/// Reset password input
#[derive(Debug, Clone)]
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

/// Reset password use case
pub struct ResetPasswordUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> ResetPasswordUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: ResetPasswordInput) -> UsersResult<()> {
        let now = Utc::now();
        let password = new_password(input.new_password)?;

        let mut user = user_for_signed_token(
            self.repo.as_ref(),
            &self.config.token_secret,
            TokenPurpose::PasswordReset,
            &input.token,
            now,
        )
        .await?;

        user.change_password(password.hash_with_iterations(self.config.password_iterations));
        let user_id = user.id;

        let mut changes = ChangeSet::new(now);
        let mut revoked = 0;
        for mut session in self.repo.list_active_sessions(user_id, now).await? {
            session.revoke(REVOKED_BY_PASSWORD_RESET, now);
            changes.update(session);
            revoked += 1;
        }
        changes.update(user);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "Password reset");
        Ok(())
    }
}

/// Change password input
#[derive(Debug, Clone)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Change password use case
pub struct ChangePasswordUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> ChangePasswordUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    /// Sessions other than `current_session` are revoked
    pub async fn execute(
        &self,
        user_id: UserId,
        current_session: Option<SessionId>,
        input: ChangePasswordInput,
    ) -> UsersResult<()> {
        let now = Utc::now();
        let mut user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UsersError::UserNotFound)?;

        let current = ClearTextPassword::for_verification(input.current_password);
        if !user.password_hash.verify(&current) {
            return Err(UsersError::IncorrectPassword);
        }

        let password = new_password(input.new_password)?;
        if user.password_hash.verify(&password) {
            return Err(UsersError::SamePassword);
        }

        user.change_password(password.hash_with_iterations(self.config.password_iterations));

        let mut changes = ChangeSet::new(now);
        for mut session in self.repo.list_active_sessions(user_id, now).await? {
            if Some(session.id) != current_session {
                session.revoke(REVOKED_BY_PASSWORD_CHANGE, now);
                changes.update(session);
            }
        }
        changes.update(user);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}
