//! Outgoing account email
//!
//! Confirmation and password reset links carry a signed, purpose-scoped
//! token bound to the user's security stamp, so rotating the stamp
//! invalidates every link already sent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform::token::{self, TokenPurpose};

use crate::application::config::UsersConfig;
use crate::domain::entity::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync + 'static {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email sent"
        );
        Ok(())
    }
}

/// Builds and sends the account emails
#[derive(Clone)]
pub struct AccountMailer {
    sender: Arc<dyn EmailSender>,
    config: Arc<UsersConfig>,
}

impl AccountMailer {
    pub fn new(sender: Arc<dyn EmailSender>, config: Arc<UsersConfig>) -> Self {
        Self { sender, config }
    }

    pub fn confirmation_token(&self, user: &User, now: DateTime<Utc>) -> String {
        self.sign(user, TokenPurpose::EmailConfirmation, now)
    }

    pub fn password_reset_token(&self, user: &User, now: DateTime<Utc>) -> String {
        self.sign(user, TokenPurpose::PasswordReset, now)
    }

    pub async fn send_confirmation(
        &self,
        user: &User,
        name: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let token = self.confirmation_token(user, now);
        let link = format!(
            "{}/confirm-email?token={}",
            self.config.app_base_url.trim_end_matches('/'),
            token
        );
        self.sender
            .send(EmailMessage {
                to: user.email.as_str().to_string(),
                subject: "Confirm your email address".to_string(),
                body: format!(
                    "Hello {name},\n\nConfirm your email address by opening the link below:\n{link}\n\nThe link expires in {} hours.",
                    platform::token::EMAIL_CONFIRMATION_HOURS
                ),
            })
            .await
    }

    pub async fn send_password_reset(&self, user: &User, now: DateTime<Utc>) -> anyhow::Result<()> {
        let token = self.password_reset_token(user, now);
        let link = format!(
            "{}/reset-password?token={}",
            self.config.app_base_url.trim_end_matches('/'),
            token
        );
        self.sender
            .send(EmailMessage {
                to: user.email.as_str().to_string(),
                subject: "Reset your password".to_string(),
                body: format!(
                    "A password reset was requested for your account.\n\nOpen the link below to choose a new password:\n{link}\n\nThe link expires in {} hours. If you did not ask for this, ignore this email.",
                    platform::token::PASSWORD_RESET_HOURS
                ),
            })
            .await
    }

    fn sign(&self, user: &User, purpose: TokenPurpose, now: DateTime<Utc>) -> String {
        token::sign(
            &self.config.token_secret,
            purpose,
            &user.id.to_string(),
            &user.security_stamp,
            now + purpose.lifetime(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::email::Email;
    use platform::password::ClearTextPassword;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SentMail(Mutex<Vec<EmailMessage>>);

    #[async_trait]
    impl EmailSender for SentMail {
        async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_confirmation_link_carries_verifiable_token() {
        let config = Arc::new(UsersConfig::development());
        let sent = Arc::new(SentMail::default());
        let mailer = AccountMailer::new(sent.clone(), config.clone());

        let now = Utc::now();
        let hash = ClearTextPassword::for_verification("x".into()).hash_with_iterations(1_000);
        let user = User::register(Email::new("ana@example.com").unwrap(), hash, now);
        mailer.send_confirmation(&user, "Ana", now).await.unwrap();

        let messages = sent.0.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, "ana@example.com");

        let token = messages[0].body.split("token=").nth(1).unwrap().lines().next().unwrap();
        let parts = token::verify(
            &config.token_secret,
            TokenPurpose::EmailConfirmation,
            token,
            &user.security_stamp,
            now,
        )
        .unwrap();
        assert_eq!(parts.subject, user.id.to_string());
    }
}
