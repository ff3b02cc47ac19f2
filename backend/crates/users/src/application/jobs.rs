//! Session maintenance job

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use outbox::BackgroundJob;

use crate::application::config::UsersConfig;
use crate::domain::repository::UsersStore;
use crate::error::UsersResult;

/// Deletes sessions that expired or were revoked before the retention window
pub struct ExpiredSessionCleanupJob<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    retention: Duration,
    interval: Duration,
}

impl<R> ExpiredSessionCleanupJob<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: &UsersConfig) -> Self {
        Self {
            repo,
            retention: config.session_retention,
            interval: config.session_cleanup_interval,
        }
    }

    /// One cleanup pass; returns how many sessions were deleted
    pub async fn cleanup(&self) -> UsersResult<u64> {
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| crate::error::UsersError::Internal(e.to_string()))?;
        let cutoff = Utc::now() - retention;
        self.repo.delete_stale_sessions(cutoff).await
    }
}

#[async_trait]
impl<R> BackgroundJob for ExpiredSessionCleanupJob<R>
where
    R: UsersStore,
{
    fn name(&self) -> &'static str {
        "expired-session-cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let deleted = self.cleanup().await?;
        tracing::info!(sessions_deleted = deleted, "Expired session cleanup completed");
        Ok(())
    }
}
