//! Batch dispatcher
//!
//! Builds tasks from raw URLs, opens the output, drives the worker pool with
//! the sink attached as the result callback, and finalizes the sink once the
//! pool drains. The batch lifecycle is tracked as a [`BatchState`].

use crate::config::CheckerConfig;
use crate::engine::pool::{PoolStats, WorkerPool};
use crate::output::{BatchSummary, OutputTarget, ResultSink, RunStatus, SinkError};
use crate::probe::{Probe, ProbeKind, ProbeReport};
use crate::state::BatchState;
use crate::url::UrlTask;
use crate::{Result, SentryError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs batches of URLs through one probe
pub struct Dispatcher {
    probe: Arc<dyn Probe>,
    pool: WorkerPool,
    config_hash: String,
}

impl Dispatcher {
    /// Creates a dispatcher using the checker's concurrency and timeout
    pub fn new(probe: Arc<dyn Probe>, checker: &CheckerConfig) -> Self {
        Self::with_pool(probe, WorkerPool::new(checker.concurrency, checker.timeout()))
    }

    pub fn with_pool(probe: Arc<dyn Probe>, pool: WorkerPool) -> Self {
        Self {
            probe,
            pool,
            config_hash: String::new(),
        }
    }

    /// Sets the configuration hash recorded with each run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Checks `urls` and writes one record per completed URL to `target`
    ///
    /// # Returns
    ///
    /// * `Ok(BatchSummary)` - The batch drained, fully or after cancellation
    /// * `Err(SentryError)` - Empty input, or the output could not be written
    pub async fn run_batch(
        &self,
        urls: &[String],
        kind: ProbeKind,
        target: &OutputTarget,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let tasks = build_tasks(urls)?;
        let mut lifecycle = Lifecycle::default();
        lifecycle.advance(BatchState::Running)?;

        let mut sink = match target.open(kind, &self.config_hash) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!("Cannot open output {}: {}", target.path().display(), e);
                lifecycle.advance(BatchState::Aborted)?;
                return Err(e.into());
            }
        };

        let mut summary = self
            .drive(tasks, kind, sink.as_mut(), cancel, &mut lifecycle)
            .await?;
        summary.output = Some(target.path().display().to_string());
        Ok(summary)
    }

    /// Like [`run_batch`](Self::run_batch), writing to a caller-owned sink
    pub async fn run_batch_with_sink(
        &self,
        urls: &[String],
        kind: ProbeKind,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let tasks = build_tasks(urls)?;
        let mut lifecycle = Lifecycle::default();
        lifecycle.advance(BatchState::Running)?;

        self.drive(tasks, kind, sink, cancel, &mut lifecycle).await
    }

    async fn drive(
        &self,
        tasks: Vec<UrlTask>,
        kind: ProbeKind,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
        lifecycle: &mut Lifecycle,
    ) -> Result<BatchSummary> {
        let started = Instant::now();
        let mut summary = BatchSummary::new(kind, tasks.len() as u64);
        if !self.config_hash.is_empty() {
            summary.config_hash = Some(self.config_hash.clone());
        }

        tracing::info!(
            "Checking {} URLs ({} mode, {} concurrent, {}ms timeout)",
            tasks.len(),
            kind,
            self.pool.concurrency(),
            self.pool.timeout().as_millis()
        );

        let drained = self
            .pool
            .run(tasks, kind, self.probe.clone(), cancel, |report| {
                sink.on_result(&report)?;
                log_report(&report);
                summary.record(&report);
                Ok::<(), SinkError>(())
            })
            .await;

        let stats = match drained {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Writing results failed, aborting batch: {}", e);
                lifecycle.advance(BatchState::Aborted)?;
                sink.mark_status(RunStatus::Aborted);
                if let Err(finalize_error) = sink.finalize() {
                    tracing::warn!("Closing output after failure also failed: {}", finalize_error);
                }
                return Err(e.into());
            }
        };

        lifecycle.advance(BatchState::Draining)?;
        let cancelled = cancel.is_cancelled();
        sink.mark_status(if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        });
        sink.finalize()?;
        lifecycle.advance(BatchState::Done)?;

        finish_summary(&mut summary, stats, cancelled, lifecycle.state, started);

        if cancelled {
            tracing::warn!(
                "Batch cancelled: {} of {} URLs recorded, {} abandoned",
                summary.completed,
                summary.total,
                summary.abandoned
            );
        } else {
            tracing::info!(
                "Batch complete: {} URLs in {:.2}s, {} failed",
                summary.completed,
                summary.elapsed.as_secs_f64(),
                summary.failed_total()
            );
        }

        Ok(summary)
    }
}

fn build_tasks(urls: &[String]) -> Result<Vec<UrlTask>> {
    if urls.is_empty() {
        return Err(SentryError::EmptyBatch);
    }
    Ok(UrlTask::from_list(urls))
}

fn finish_summary(
    summary: &mut BatchSummary,
    stats: PoolStats,
    cancelled: bool,
    state: BatchState,
    started: Instant,
) {
    summary.abandoned = stats.abandoned;
    summary.cancelled = cancelled;
    summary.state = state;
    summary.elapsed = started.elapsed();
}

fn log_report(report: &ProbeReport) {
    match &report.result {
        Ok(outcome) => {
            tracing::debug!("{} -> {:?}", report.task.original(), outcome);
        }
        Err(failure) => {
            tracing::warn!("{} failed: {}", report.task.original(), failure);
        }
    }
}

/// Batch state with checked transitions
#[derive(Debug, Default)]
struct Lifecycle {
    state: BatchState,
}

impl Lifecycle {
    fn advance(&mut self, next: BatchState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SentryError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Batch state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemorySink, SinkResult};
    use crate::probe::{ErrorKind, Outcome, ProbeFailure, ProbeResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Answers from a fixed table, with an optional delay
    struct TableProbe {
        answers: HashMap<String, ProbeResult>,
        delay: Duration,
    }

    impl TableProbe {
        fn new(delay: Duration) -> Self {
            Self {
                answers: HashMap::new(),
                delay,
            }
        }

        fn answer(mut self, url: &str, result: ProbeResult) -> Self {
            self.answers.insert(url.to_string(), result);
            self
        }
    }

    #[async_trait]
    impl Probe for TableProbe {
        async fn probe(&self, task: &UrlTask, _kind: ProbeKind) -> ProbeResult {
            tokio::time::sleep(self.delay).await;
            self.answers
                .get(task.original())
                .cloned()
                .unwrap_or(Ok(Outcome::Status { code: 200 }))
        }
    }

    /// Accepts a fixed number of records, then fails like a full disk
    struct FailingSink {
        accept: u64,
        written: u64,
        status: Option<RunStatus>,
    }

    impl ResultSink for FailingSink {
        fn on_result(&mut self, _report: &ProbeReport) -> SinkResult<()> {
            if self.written == self.accept {
                return Err(SinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no space left on device",
                )));
            }
            self.written += 1;
            Ok(())
        }

        fn mark_status(&mut self, status: RunStatus) {
            self.status = Some(status);
        }

        fn finalize(&mut self) -> SinkResult<()> {
            Ok(())
        }

        fn records_written(&self) -> u64 {
            self.written
        }
    }

    fn urls(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("site{}.com", i)).collect()
    }

    fn dispatcher(probe: TableProbe, concurrency: usize) -> Dispatcher {
        Dispatcher::with_pool(
            Arc::new(probe),
            WorkerPool::new(concurrency, Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_batch_records_every_url() {
        let probe = TableProbe::new(Duration::from_millis(2))
            .answer("site3.com", Ok(Outcome::Status { code: 404 }))
            .answer(
                "site5.com",
                Err(ProbeFailure::new(ErrorKind::ConnectionRefused, "refused")),
            );
        let dispatcher = dispatcher(probe, 3);
        let mut sink = MemorySink::new();

        let summary = dispatcher
            .run_batch_with_sink(&urls(8), ProbeKind::Status, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.total, 8);
        assert_eq!(summary.completed, 8);
        assert_eq!(summary.abandoned, 0);
        assert_eq!(summary.state, BatchState::Done);
        assert!(!summary.cancelled);
        assert_eq!(summary.succeeded.get("200"), Some(&6));
        assert_eq!(summary.succeeded.get("404"), Some(&1));
        assert_eq!(summary.failed.get(&ErrorKind::ConnectionRefused), Some(&1));

        assert_eq!(sink.status(), Some(RunStatus::Completed));
        let mut seen: Vec<String> = sink
            .reports()
            .iter()
            .map(|r| r.task.original().to_string())
            .collect();
        seen.sort();
        let mut expected = urls(8);
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let dispatcher = dispatcher(TableProbe::new(Duration::ZERO), 2);
        let mut sink = MemorySink::new();

        let result = dispatcher
            .run_batch_with_sink(&[], ProbeKind::Status, &mut sink, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SentryError::EmptyBatch)));
        assert_eq!(sink.status(), None);
    }

    #[tokio::test]
    async fn test_cancelled_batch_drains_to_done() {
        let dispatcher = dispatcher(TableProbe::new(Duration::from_secs(30)), 2);
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let summary = dispatcher
            .run_batch_with_sink(&urls(5), ProbeKind::Status, &mut sink, &cancel)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.state, BatchState::Done);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.abandoned, 5);
        assert_eq!(sink.status(), Some(RunStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_batch() {
        let dispatcher = dispatcher(TableProbe::new(Duration::from_millis(1)), 1);
        let mut sink = FailingSink {
            accept: 2,
            written: 0,
            status: None,
        };

        let result = dispatcher
            .run_batch_with_sink(&urls(6), ProbeKind::Status, &mut sink, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SentryError::Sink(SinkError::Io(_)))));
        assert_eq!(sink.records_written(), 2);
        assert_eq!(sink.status, Some(RunStatus::Aborted));
    }

    #[tokio::test]
    async fn test_unwritable_target_aborts() {
        let dir = TempDir::new().unwrap();
        let target = OutputTarget::Csv(dir.path().join("missing").join("out.csv"));
        let dispatcher = dispatcher(TableProbe::new(Duration::ZERO), 2);

        let result = dispatcher
            .run_batch(&urls(2), ProbeKind::Status, &target, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SentryError::Sink(SinkError::Io(_)))));
    }

    #[tokio::test]
    async fn test_run_batch_to_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let target = OutputTarget::Csv(path.clone());
        let dispatcher = dispatcher(TableProbe::new(Duration::from_millis(1)), 4)
            .with_config_hash("cafebabe");

        let summary = dispatcher
            .run_batch(&urls(12), ProbeKind::Status, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.completed, 12);
        assert_eq!(summary.config_hash.as_deref(), Some("cafebabe"));
        assert_eq!(summary.output, Some(path.display().to_string()));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 12);
    }

    #[test]
    fn test_lifecycle_rejects_invalid_transition() {
        let mut lifecycle = Lifecycle::default();
        let result = lifecycle.advance(BatchState::Done);

        assert!(matches!(
            result,
            Err(SentryError::InvalidTransition {
                from: BatchState::Idle,
                to: BatchState::Done
            })
        ));

        lifecycle.advance(BatchState::Running).unwrap();
        lifecycle.advance(BatchState::Draining).unwrap();
        assert!(lifecycle.advance(BatchState::Aborted).is_err());
        lifecycle.advance(BatchState::Done).unwrap();
        assert_eq!(lifecycle.state, BatchState::Done);
    }
}
