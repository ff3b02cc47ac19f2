//! Session Use Cases
//!
//! Active session listing and revocation, and the login history view.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{SessionId, UserId};

use crate::application::config::UsersConfig;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::session::REVOKED_BY_USER;
use crate::domain::entity::{LoginHistory, Session};
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// An active session and whether the caller is using it
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session: Session,
    pub is_current: bool,
}

/// Session use cases
pub struct SessionUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> SessionUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn list(
        &self,
        user_id: UserId,
        current: Option<SessionId>,
    ) -> UsersResult<Vec<SessionView>> {
        let sessions = self.repo.list_active_sessions(user_id, Utc::now()).await?;
        Ok(sessions
            .into_iter()
            .map(|session| SessionView {
                is_current: Some(session.id) == current,
                session,
            })
            .collect())
    }

    pub async fn revoke(&self, user_id: UserId, session_id: SessionId) -> UsersResult<()> {
        let now = Utc::now();
        let mut session = self
            .repo
            .find_session(session_id)
            .await?
            .ok_or(UsersError::SessionNotFound)?;
        if session.user_id != user_id {
            tracing::warn!(user_id = %user_id, session_id = %session_id, "Session ownership check failed");
            return Err(UsersError::Forbidden);
        }
        if session.is_revoked() {
            return Ok(());
        }

        session.revoke(REVOKED_BY_USER, now);
        let mut changes = ChangeSet::new(now);
        changes.update(session);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every active session except `current`; returns how many
    pub async fn revoke_others(
        &self,
        user_id: UserId,
        current: Option<SessionId>,
    ) -> UsersResult<usize> {
        let now = Utc::now();
        let mut changes = ChangeSet::new(now);
        let mut revoked = 0;
        for mut session in self.repo.list_active_sessions(user_id, now).await? {
            if Some(session.id) == current {
                continue;
            }
            session.revoke(REVOKED_BY_USER, now);
            changes.update(session);
            revoked += 1;
        }
        if revoked > 0 {
            self.repo.commit(changes).await?;
        }

        tracing::info!(user_id = %user_id, revoked, "Other sessions revoked");
        Ok(revoked)
    }

    pub async fn login_history(&self, user_id: UserId) -> UsersResult<Vec<LoginHistory>> {
        self.repo
            .recent_logins(user_id, self.config.login_history_limit)
            .await
    }
}
