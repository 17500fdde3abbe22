//! Bounded worker pool
//!
//! The pool coordinates:
//! - A global concurrency limit (a semaphore with `concurrency` permits)
//! - A per-probe timeout
//! - Batch cancellation through a [`CancellationToken`]
//!
//! Probes run as tasks in a `JoinSet`. The driver loop in [`WorkerPool::run`]
//! is the only place results are delivered, so the result callback is never
//! called concurrently with itself.

use crate::probe::{ErrorKind, Probe, ProbeFailure, ProbeKind, ProbeReport, ProbeResult};
use crate::url::UrlTask;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

/// Counters reported when the pool drains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks handed to a probe
    pub dispatched: u64,

    /// Tasks whose report was delivered to the callback
    pub completed: u64,

    /// Tasks dropped by cancellation, queued or in flight
    pub abandoned: u64,
}

/// Fixed-size pool of concurrent probe slots
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    timeout: Duration,
}

impl WorkerPool {
    /// Creates a pool; a concurrency of zero is raised to one
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs every task through `probe` and hands each report to `on_result`
    ///
    /// Reports arrive in completion order. A freed slot is refilled from the
    /// queue immediately. If `on_result` fails, in-flight probes are aborted
    /// and the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(PoolStats)` - All tasks completed, or the batch was cancelled
    /// * `Err(E)` - The callback failed
    pub async fn run<F, E>(
        &self,
        tasks: Vec<UrlTask>,
        kind: ProbeKind,
        probe: Arc<dyn Probe>,
        cancel: &CancellationToken,
        mut on_result: F,
    ) -> Result<PoolStats, E>
    where
        F: FnMut(ProbeReport) -> Result<(), E>,
    {
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut queue: VecDeque<UrlTask> = tasks.into();
        let mut in_flight: JoinSet<(UrlTask, Option<ProbeResult>)> = JoinSet::new();
        let mut pending: HashMap<Id, UrlTask> = HashMap::new();
        let mut stats = PoolStats::default();
        let mut stopping = false;

        loop {
            let has_work = !queue.is_empty() || !in_flight.is_empty();

            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !stopping && has_work => {
                    stopping = true;
                    stats.abandoned += queue.len() as u64;
                    tracing::warn!(
                        "Cancellation requested: {} queued and {} in-flight URLs abandoned",
                        queue.len(),
                        in_flight.len()
                    );
                    queue.clear();
                }

                Some(joined) = in_flight.join_next_with_id(), if !in_flight.is_empty() => {
                    let report = match joined {
                        Ok((id, (task, Some(result)))) => {
                            pending.remove(&id);
                            ProbeReport::new(task, result)
                        }
                        Ok((id, (_, None))) => {
                            pending.remove(&id);
                            stats.abandoned += 1;
                            continue;
                        }
                        Err(join_error) => {
                            let Some(task) = pending.remove(&join_error.id()) else {
                                continue;
                            };
                            if join_error.is_cancelled() {
                                stats.abandoned += 1;
                                continue;
                            }
                            tracing::error!("Probe for {} panicked: {}", task.original(), join_error);
                            ProbeReport::new(
                                task,
                                Err(ProbeFailure::new(
                                    ErrorKind::Unknown,
                                    format!("probe panicked: {}", join_error),
                                )),
                            )
                        }
                    };

                    stats.completed += 1;
                    if let Err(e) = on_result(report) {
                        in_flight.abort_all();
                        return Err(e);
                    }
                }

                permit = slots.clone().acquire_owned(), if !stopping && !queue.is_empty() => {
                    let Ok(permit) = permit else {
                        break;
                    };
                    if let Some(task) = queue.pop_front() {
                        tracing::trace!("Dispatching {}", task.normalized());
                        let handle = in_flight.spawn(run_probe(
                            probe.clone(),
                            task.clone(),
                            kind,
                            self.timeout,
                            cancel.clone(),
                            permit,
                        ));
                        pending.insert(handle.id(), task);
                        stats.dispatched += 1;
                    }
                }

                else => break,
            }
        }

        Ok(stats)
    }
}

/// Runs one probe while holding a pool slot
///
/// Returns `None` when the batch is cancelled before the probe finishes.
async fn run_probe(
    probe: Arc<dyn Probe>,
    task: UrlTask,
    kind: ProbeKind,
    timeout: Duration,
    cancel: CancellationToken,
    _permit: OwnedSemaphorePermit,
) -> (UrlTask, Option<ProbeResult>) {
    let result = tokio::select! {
        _ = cancel.cancelled() => None,
        outcome = tokio::time::timeout(timeout, probe.probe(&task, kind)) => {
            Some(outcome.unwrap_or_else(|_| Err(ProbeFailure::timeout(timeout))))
        }
    };
    (task, result)
}
