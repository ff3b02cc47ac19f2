//! Periodic background jobs
//!
//! Each job gets its own task that sleeps for the job's interval, runs it,
//! and repeats until shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::config::OutboxConfig;
use super::processor::OutboxProcessor;
use crate::domain::repository::OutboxRepository;

/// Pause after a failed run before trying again
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(30);

#[async_trait]
pub trait BackgroundJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn run(&self) -> anyhow::Result<()>;
}

/// Handle to the spawned job loops.
/// Dropping it also stops the loops, since receivers see the channel close.
pub struct BackgroundJobRunner {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    error_backoff: Duration,
}

impl Default for BackgroundJobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundJobRunner {
    pub fn new() -> Self {
        Self::with_error_backoff(DEFAULT_ERROR_BACKOFF)
    }

    pub fn with_error_backoff(error_backoff: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            joins: Vec::new(),
            error_backoff,
        }
    }

    pub fn spawn(&mut self, job: Arc<dyn BackgroundJob>) {
        let rx = self.shutdown_tx.subscribe();
        let backoff = self.error_backoff;
        tracing::info!(job = job.name(), interval = ?job.interval(), "Starting background job");
        self.joins
            .push(tokio::spawn(job_loop(job, rx, backoff)));
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Ask every loop to stop; a run in progress is allowed to finish
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "Background job task panicked");
            }
        }
        tracing::info!("Background jobs stopped");
    }
}

async fn job_loop(
    job: Arc<dyn BackgroundJob>,
    mut shutdown_rx: watch::Receiver<bool>,
    error_backoff: Duration,
) {
    let mut delay = job.interval();
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match job.run().await {
            Ok(()) => delay = job.interval(),
            Err(e) => {
                tracing::error!(
                    job = job.name(),
                    error = %format!("{e:#}"),
                    backoff = ?error_backoff,
                    "Background job failed"
                );
                delay = error_backoff;
            }
        }
    }
    tracing::debug!(job = job.name(), "Background job loop exited");
}

// ============================================================================
// Outbox jobs
// ============================================================================

/// Runs one relay batch per polling interval
pub struct OutboxProcessorJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    processor: OutboxProcessor<R>,
    interval: Duration,
}

impl<R> OutboxProcessorJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    pub fn new(processor: OutboxProcessor<R>, config: &OutboxConfig) -> Self {
        Self {
            processor,
            interval: config.polling_interval,
        }
    }
}

#[async_trait]
impl<R> BackgroundJob for OutboxProcessorJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "outbox-processor"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.processor.process_batch(Utc::now()).await?;
        Ok(())
    }
}

/// Purges processed messages past the retention period
pub struct OutboxRetentionJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    retention: Duration,
    interval: Duration,
}

impl<R> OutboxRetentionJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: &OutboxConfig) -> Self {
        Self {
            repo,
            retention: config.retention,
            interval: config.retention_interval,
        }
    }
}

#[async_trait]
impl<R> BackgroundJob for OutboxRetentionJob<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "outbox-retention"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let retention = chrono::Duration::from_std(self.retention)?;
        let cutoff = Utc::now() - retention;

        let deleted = self.repo.purge_processed(cutoff).await?;
        let stats = self.repo.stats().await?;

        tracing::info!(
            messages_deleted = deleted,
            pending = stats.pending,
            processed = stats.processed,
            failed = stats.failed,
            "Outbox retention completed"
        );
        Ok(())
    }
}
