//! Login Use Case
//!
//! Verifies credentials, enforces lockout and opens a session.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;
use platform::client::ClientInfo;
use platform::jwt::JwtService;
use platform::password::ClearTextPassword;

use crate::application::config::UsersConfig;
use crate::application::tokens::{AuthTokens, issue_access_token};
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::login_history::{
    FAILURE_ACCOUNT_LOCKED, FAILURE_EMAIL_NOT_CONFIRMED, FAILURE_INVALID_PASSWORD,
};
use crate::domain::entity::session::REVOKED_SESSION_LIMIT;
use crate::domain::entity::{LoginHistory, Session, SessionDevice};
use crate::domain::repository::UsersStore;
use crate::domain::value_object::email::Email;
use crate::error::{UsersError, UsersResult};

/// Login input
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
}

/// Login output
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub user_id: UserId,
    pub email: String,
    pub roles: Vec<String>,
    pub tokens: AuthTokens,
}

/// Login use case
pub struct LoginUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    jwt: Arc<JwtService>,
    config: Arc<UsersConfig>,
}

impl<R> LoginUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, jwt: Arc<JwtService>, config: Arc<UsersConfig>) -> Self {
        Self { repo, jwt, config }
    }

    pub async fn execute(&self, input: LoginInput, client: ClientInfo) -> UsersResult<LoginOutput> {
        let now = Utc::now();

        // Unknown and malformed emails look the same as a wrong password
        let email = Email::new(input.email.as_str()).map_err(|_| UsersError::InvalidCredentials)?;
        let mut user = self
            .repo
            .find_user_by_email(&email)
            .await?
            .ok_or(UsersError::InvalidCredentials)?;

        if user.is_locked(now) {
            let mut changes = ChangeSet::new(now);
            changes.insert(LoginHistory::create_failure(
                user.id,
                FAILURE_ACCOUNT_LOCKED,
                &client,
                now,
            ));
            self.repo.commit(changes).await?;
            return Err(UsersError::AccountLocked);
        }

        let password = ClearTextPassword::for_verification(input.password);
        if !user.password_hash.verify(&password) {
            let user_id = user.id;
            let locked = user.record_failed_login(now);

            let mut changes = ChangeSet::new(now);
            changes.update(user).insert(LoginHistory::create_failure(
                user_id,
                FAILURE_INVALID_PASSWORD,
                &client,
                now,
            ));
            self.repo.commit(changes).await?;

            if locked {
                tracing::warn!(user_id = %user_id, "Account locked after repeated failed logins");
            }
            return Err(UsersError::InvalidCredentials);
        }

        if self.config.require_confirmed_email && !user.email_confirmed {
            let mut changes = ChangeSet::new(now);
            changes.insert(LoginHistory::create_failure(
                user.id,
                FAILURE_EMAIL_NOT_CONFIRMED,
                &client,
                now,
            ));
            self.repo.commit(changes).await?;
            return Err(UsersError::EmailNotConfirmed);
        }

        user.record_successful_login(now);
        if user.password_hash.needs_rehash_for(self.config.password_iterations) {
            user.rehash_password(password.hash_with_iterations(self.config.password_iterations));
            tracing::debug!(user_id = %user.id, "Password rehashed with current work factor");
        }

        let refresh = self.jwt.generate_refresh_token();
        let refresh_expires_at = self.jwt.refresh_token_expires_at(now);
        let device = SessionDevice {
            device_id: input.device_id,
            device_name: input.device_name,
            ..SessionDevice::from_client(&client)
        };
        let session = Session::create(user.id, refresh.hash, device, refresh_expires_at, now);

        let access = issue_access_token(&self.jwt, &user, &session, now)?;

        let mut changes = ChangeSet::new(now);

        // Make room for the new session, oldest first
        let mut active = self.repo.list_active_sessions(user.id, now).await?;
        let keep = self.config.max_active_sessions.saturating_sub(1);
        if active.len() > keep {
            active.sort_by_key(|s| s.created_at);
            let excess = active.len() - keep;
            for mut stale in active.into_iter().take(excess) {
                stale.revoke(REVOKED_SESSION_LIMIT, now);
                changes.update(stale);
            }
        }

        let output = LoginOutput {
            user_id: user.id,
            email: user.email.as_str().to_string(),
            roles: user.role_codes(),
            tokens: AuthTokens {
                access_token: access.token,
                access_token_expires_at: access.expires_at,
                refresh_token: refresh.token,
                refresh_token_expires_at: refresh_expires_at,
            },
        };
        let session_id = session.id;

        changes
            .insert(LoginHistory::create_success(user.id, &client, now))
            .update(user)
            .insert(session);
        self.repo.commit(changes).await?;

        tracing::info!(
            user_id = %output.user_id,
            session_id = %session_id,
            device_type = %client.device_type,
            "User logged in"
        );

        Ok(output)
    }
}
