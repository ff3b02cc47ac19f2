//! Refresh Token Use Case
//!
//! Exchanges a refresh token (plus the possibly expired access token) for a
//! new token pair. Refresh tokens rotate on every use; presenting a revoked
//! one is treated as theft and ends every session of the user.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;
use platform::jwt::JwtService;

use crate::application::tokens::{AuthTokens, issue_access_token};
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::session::REVOKED_TOKEN_REUSE;
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Refresh input
#[derive(Debug, Clone)]
pub struct RefreshInput {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh token use case
pub struct RefreshTokenUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    jwt: Arc<JwtService>,
}

impl<R> RefreshTokenUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, jwt: Arc<JwtService>) -> Self {
        Self { repo, jwt }
    }

    pub async fn execute(&self, input: RefreshInput) -> UsersResult<AuthTokens> {
        let now = Utc::now();

        let user_id = self
            .jwt
            .user_id_from_expired_token(&input.access_token)
            .map(UserId::from_uuid)
            .ok_or(UsersError::InvalidRefreshToken)?;

        let hash = self.jwt.hash_refresh_token(&input.refresh_token);
        let mut session = self
            .repo
            .find_session_by_refresh_hash(&hash)
            .await?
            .ok_or(UsersError::InvalidRefreshToken)?;

        if session.user_id != user_id {
            tracing::warn!(
                user_id = %user_id,
                session_id = %session.id,
                "Refresh token presented with another user's access token"
            );
            return Err(UsersError::InvalidRefreshToken);
        }

        if session.is_revoked() {
            let mut changes = ChangeSet::new(now);
            for mut active in self.repo.list_active_sessions(user_id, now).await? {
                active.revoke(REVOKED_TOKEN_REUSE, now);
                changes.update(active);
            }
            self.repo.commit(changes).await?;
            tracing::warn!(
                user_id = %user_id,
                session_id = %session.id,
                "Revoked refresh token reused; all sessions revoked"
            );
            return Err(UsersError::RefreshTokenReused);
        }

        if session.is_expired(now) {
            return Err(UsersError::RefreshTokenExpired);
        }

        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UsersError::InvalidRefreshToken)?;

        let refresh = self.jwt.generate_refresh_token();
        let refresh_expires_at = self.jwt.refresh_token_expires_at(now);
        session.update_refresh_token(refresh.hash, refresh_expires_at, now);

        let access = issue_access_token(&self.jwt, &user, &session, now)?;

        let mut changes = ChangeSet::new(now);
        changes.update(session);
        self.repo.commit(changes).await?;

        tracing::debug!(user_id = %user_id, "Access token refreshed");

        Ok(AuthTokens {
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_token_expires_at: refresh_expires_at,
        })
    }
}
