//! Relay and job tests over an in-memory store

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{OutboxEvent, OutboxMessage, OutboxRepository, OutboxStats, OutboxStatus};
use crate::error::OutboxResult;

#[derive(Default)]
struct InMemoryOutbox {
    messages: Mutex<Vec<OutboxMessage>>,
}

impl InMemoryOutbox {
    fn with(messages: Vec<OutboxMessage>) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(messages),
        })
    }

    fn get(&self, id: kernel::id::OutboxMessageId) -> OutboxMessage {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .unwrap()
    }

    fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl OutboxRepository for InMemoryOutbox {
    async fn fetch_ready(
        &self,
        now: DateTime<Utc>,
        limit: u32,
        max_attempts: u32,
    ) -> OutboxResult<Vec<OutboxMessage>> {
        let mut ready: Vec<_> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_ready(now, max_attempts))
            .cloned()
            .collect();
        ready.sort_by_key(|m| m.occurred_at);
        ready.truncate(limit as usize);
        Ok(ready)
    }

    async fn save(&self, message: &OutboxMessage) -> OutboxResult<()> {
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => messages.push(message.clone()),
        }
        Ok(())
    }

    async fn save_all(&self, messages: &[OutboxMessage]) -> OutboxResult<()> {
        for message in messages {
            self.save(message).await?;
        }
        Ok(())
    }

    async fn purge_processed(&self, older_than: DateTime<Utc>) -> OutboxResult<u64> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| {
            !(m.status() == OutboxStatus::Processed
                && m.processed_at.is_some_and(|at| at < older_than))
        });
        Ok((before - messages.len()) as u64)
    }

    async fn stats(&self) -> OutboxResult<OutboxStats> {
        let messages = self.messages.lock().unwrap();
        let mut stats = OutboxStats::default();
        for m in messages.iter() {
            match m.status() {
                OutboxStatus::Pending => stats.pending += 1,
                OutboxStatus::Processed => stats.processed += 1,
                OutboxStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

#[derive(Serialize, Deserialize)]
struct Numbered {
    n: u32,
}

impl OutboxEvent for Numbered {
    const EVENT_TYPE: &'static str = "test.numbered";
}

#[derive(Serialize, Deserialize)]
struct Doomed;

impl OutboxEvent for Doomed {
    const EVENT_TYPE: &'static str = "test.doomed";
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn numbered(n: u32, occurred_at: DateTime<Utc>) -> OutboxMessage {
    OutboxMessage::from_event(&Numbered { n }, occurred_at).unwrap()
}

/// Records every `n` it sees, in order
#[derive(Default, Clone)]
struct Recorder(Arc<Mutex<Vec<u32>>>);

#[async_trait]
impl crate::application::EventHandler<Numbered> for Recorder {
    async fn handle(&self, event: Numbered) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event.n);
        Ok(())
    }
}

struct AlwaysFails;

#[async_trait]
impl crate::application::EventHandler<Doomed> for AlwaysFails {
    async fn handle(&self, _event: Doomed) -> anyhow::Result<()> {
        anyhow::bail!("downstream unavailable")
    }
}

#[cfg(test)]
mod processor_tests {
    use super::*;
    use crate::application::{HandlerRegistry, OutboxConfig, OutboxProcessor};

    fn processor(
        repo: Arc<InMemoryOutbox>,
        recorder: Recorder,
        config: OutboxConfig,
    ) -> OutboxProcessor<InMemoryOutbox> {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Numbered, _>(recorder)
            .register::<Doomed, _>(AlwaysFails);
        OutboxProcessor::new(repo, Arc::new(registry), Arc::new(config))
    }

    #[tokio::test]
    async fn test_processes_in_occurred_at_order() {
        let repo = InMemoryOutbox::with(vec![
            numbered(3, t0() + Duration::seconds(3)),
            numbered(1, t0() + Duration::seconds(1)),
            numbered(2, t0() + Duration::seconds(2)),
        ]);
        let recorder = Recorder::default();
        let processor = processor(repo.clone(), recorder.clone(), OutboxConfig::default());

        let report = processor.process_batch(t0() + Duration::minutes(1)).await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.processed, 3);
        assert_eq!(*recorder.0.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(repo.stats().await.unwrap().processed, 3);
    }

    #[tokio::test]
    async fn test_concurrent_mode_processes_everything() {
        let repo = InMemoryOutbox::with((0..10).map(|n| numbered(n, t0())).collect());
        let recorder = Recorder::default();
        let config = OutboxConfig {
            process_in_order: false,
            ..Default::default()
        };
        let processor = processor(repo.clone(), recorder.clone(), config);

        let report = processor.process_batch(t0()).await.unwrap();

        assert_eq!(report.processed, 10);
        let mut seen = recorder.0.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_batch_size_limits_fetch() {
        let repo = InMemoryOutbox::with((0..5).map(|n| numbered(n, t0())).collect());
        let config = OutboxConfig {
            batch_size: 2,
            ..Default::default()
        };
        let processor = processor(repo.clone(), Recorder::default(), config);

        let report = processor.process_batch(t0()).await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(repo.stats().await.unwrap().pending, 3);
    }

    #[tokio::test]
    async fn test_handler_failure_schedules_retry() {
        let msg = OutboxMessage::from_event(&Doomed, t0()).unwrap();
        let id = msg.id;
        let repo = InMemoryOutbox::with(vec![msg]);
        let processor = processor(repo.clone(), Recorder::default(), OutboxConfig::default());

        let report = processor.process_batch(t0()).await.unwrap();
        assert_eq!(report.retried, 1);

        let stored = repo.get(id);
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.next_retry_at, Some(t0() + Duration::minutes(1)));
        assert!(stored.error.unwrap().contains("downstream unavailable"));

        // Not due yet
        let report = processor.process_batch(t0() + Duration::seconds(30)).await.unwrap();
        assert_eq!(report.fetched, 0);

        let report = processor.process_batch(t0() + Duration::minutes(1)).await.unwrap();
        assert_eq!(report.retried, 1);
        assert_eq!(
            repo.get(id).next_retry_at,
            Some(t0() + Duration::minutes(1) + Duration::minutes(5))
        );
    }

    #[tokio::test]
    async fn test_retry_ceiling_marks_failed() {
        let mut msg = OutboxMessage::from_event(&Doomed, t0()).unwrap();
        msg.retry_count = 4;
        let id = msg.id;
        let repo = InMemoryOutbox::with(vec![msg]);
        let processor = processor(repo.clone(), Recorder::default(), OutboxConfig::default());

        let report = processor.process_batch(t0()).await.unwrap();
        assert_eq!(report.failed, 1);

        let stored = repo.get(id);
        assert_eq!(stored.status(), OutboxStatus::Failed);
        assert_eq!(stored.retry_count, 5);
        assert!(stored.error.unwrap().starts_with("[PERMANENT FAILURE]"));

        let report = processor.process_batch(t0() + Duration::days(1)).await.unwrap();
        assert_eq!(report.fetched, 0);
    }

    #[tokio::test]
    async fn test_unknown_event_type_fails_immediately() {
        let msg = OutboxMessage::new("nobody.listens", serde_json::json!({}), t0()).unwrap();
        let id = msg.id;
        let repo = InMemoryOutbox::with(vec![msg]);
        let processor = processor(repo.clone(), Recorder::default(), OutboxConfig::default());

        let report = processor.process_batch(t0()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(repo.get(id).status(), OutboxStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_outbox() {
        let repo = InMemoryOutbox::with(Vec::new());
        let processor = processor(repo, Recorder::default(), OutboxConfig::default());
        assert_eq!(processor.process_batch(t0()).await.unwrap(), Default::default());
    }
}

#[cfg(test)]
mod job_tests {
    use super::*;
    use crate::application::{BackgroundJob, BackgroundJobRunner, OutboxConfig, OutboxRetentionJob};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct Ticker {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl BackgroundJob for Ticker {
        fn name(&self) -> &'static str {
            "ticker"
        }

        fn interval(&self) -> StdDuration {
            StdDuration::from_millis(5)
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("tick failed");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runner_runs_jobs_until_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut runner = BackgroundJobRunner::new();
        runner.spawn(Arc::new(Ticker {
            runs: runs.clone(),
            fail: false,
        }));
        assert_eq!(runner.len(), 1);

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        runner.shutdown_and_join().await;

        let after_shutdown = runs.load(Ordering::SeqCst);
        assert!(after_shutdown >= 2);

        tokio::time::sleep(StdDuration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn test_runner_backs_off_after_error() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut runner = BackgroundJobRunner::with_error_backoff(StdDuration::from_secs(60));
        runner.spawn(Arc::new(Ticker {
            runs: runs.clone(),
            fail: true,
        }));

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        runner.shutdown_and_join().await;

        // First run fails, the next one is a minute away
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retention_purges_only_processed() {
        let old = Utc::now() - Duration::days(30);
        let mut processed = numbered(1, old);
        processed.mark_processed(old);
        let mut failed = numbered(2, old);
        failed.mark_failed("broken", old, &crate::domain::RetryPolicy::default());
        let mut recent = numbered(3, Utc::now());
        recent.mark_processed(Utc::now());
        let pending = numbered(4, old);

        let repo = InMemoryOutbox::with(vec![processed, failed, recent, pending]);
        let job = OutboxRetentionJob::new(repo.clone(), &OutboxConfig::default());

        job.run().await.unwrap();

        assert_eq!(repo.len(), 3);
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
    }
}
