//! Result sink trait and error types
//!
//! A sink is the single writer of a batch: the worker pool hands it one report
//! at a time, in completion order.

use crate::probe::ProbeReport;
use thiserror::Error;

/// Errors that can occur while persisting results
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Sink already finalized")]
    Finalized,
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Final status of a batch run as recorded by the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Aborted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

/// Trait for result sinks
///
/// Implementations own the run state of one batch: the open output handle and
/// the records written so far.
pub trait ResultSink: Send {
    /// Persists one report
    ///
    /// The record must be durable when this returns: a crash afterwards leaves
    /// it complete and readable.
    fn on_result(&mut self, report: &ProbeReport) -> SinkResult<()>;

    /// Sets the status recorded by `finalize`; `Completed` unless told otherwise
    fn mark_status(&mut self, status: RunStatus);

    /// Flushes and closes the output, recording the final run status
    ///
    /// Calling it again is a no-op. Records already written are never lost
    /// or duplicated.
    fn finalize(&mut self) -> SinkResult<()>;

    /// Number of records persisted so far
    fn records_written(&self) -> u64;
}

/// Sink that keeps reports in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Vec<ProbeReport>,
    pending_status: Option<RunStatus>,
    status: Option<RunStatus>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far, in arrival order
    pub fn reports(&self) -> &[ProbeReport] {
        &self.reports
    }

    /// Final status, once finalized
    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }
}

impl ResultSink for MemorySink {
    fn on_result(&mut self, report: &ProbeReport) -> SinkResult<()> {
        if self.status.is_some() {
            return Err(SinkError::Finalized);
        }
        self.reports.push(report.clone());
        Ok(())
    }

    fn mark_status(&mut self, status: RunStatus) {
        self.pending_status = Some(status);
    }

    fn finalize(&mut self) -> SinkResult<()> {
        if self.status.is_none() {
            self.status = Some(self.pending_status.unwrap_or(RunStatus::Completed));
        }
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.reports.len() as u64
    }
}
