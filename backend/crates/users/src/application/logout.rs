//! Logout Use Case
//!
//! Revokes the session a refresh token belongs to.

use std::sync::Arc;

use chrono::Utc;
use platform::jwt::JwtService;

use crate::domain::change_set::ChangeSet;
use crate::domain::entity::session::REVOKED_BY_LOGOUT;
use crate::domain::repository::UsersStore;
use crate::error::UsersResult;

/// Logout use case
pub struct LogoutUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    jwt: Arc<JwtService>,
}

impl<R> LogoutUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, jwt: Arc<JwtService>) -> Self {
        Self { repo, jwt }
    }

    /// Unknown or already revoked tokens succeed silently
    pub async fn execute(&self, refresh_token: &str) -> UsersResult<()> {
        let hash = self.jwt.hash_refresh_token(refresh_token);
        let Some(mut session) = self.repo.find_session_by_refresh_hash(&hash).await? else {
            tracing::debug!("Logout with unknown refresh token");
            return Ok(());
        };
        if session.is_revoked() {
            return Ok(());
        }

        let now = Utc::now();
        let session_id = session.id;
        session.revoke(REVOKED_BY_LOGOUT, now);

        let mut changes = ChangeSet::new(now);
        changes.update(session);
        self.repo.commit(changes).await?;

        tracing::info!(session_id = %session_id, "User logged out");
        Ok(())
    }
}
