//! Batch summary counts
//!
//! The dispatcher records every report it hands to the sink here, so the
//! summary always agrees with what was persisted.

use crate::probe::{ErrorKind, Outcome, ProbeKind, ProbeReport};
use crate::state::BatchState;
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary of one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub kind: ProbeKind,

    /// Number of URLs in the batch
    pub total: u64,

    /// Number of reports persisted
    pub completed: u64,

    /// Number of URLs dropped by cancellation
    pub abandoned: u64,

    /// Successful outcomes by detail label (status code, sector, ...)
    pub succeeded: BTreeMap<String, u64>,

    /// Failures by error kind
    pub failed: BTreeMap<ErrorKind, u64>,

    pub cancelled: bool,
    pub state: BatchState,
    pub elapsed: Duration,

    pub config_hash: Option<String>,
    pub output: Option<String>,
}

impl BatchSummary {
    pub fn new(kind: ProbeKind, total: u64) -> Self {
        Self {
            kind,
            total,
            completed: 0,
            abandoned: 0,
            succeeded: BTreeMap::new(),
            failed: BTreeMap::new(),
            cancelled: false,
            state: BatchState::Idle,
            elapsed: Duration::ZERO,
            config_hash: None,
            output: None,
        }
    }

    /// Counts one persisted report
    pub fn record(&mut self, report: &ProbeReport) {
        self.completed += 1;
        match &report.result {
            Ok(outcome) => {
                *self.succeeded.entry(outcome_bucket(outcome)).or_insert(0) += 1;
            }
            Err(failure) => {
                *self.failed.entry(failure.kind).or_insert(0) += 1;
            }
        }
    }

    pub fn succeeded_total(&self) -> u64 {
        self.succeeded.values().sum()
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.values().sum()
    }

    /// Successful share of completed URLs, in percent
    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            (self.succeeded_total() as f64 / self.completed as f64) * 100.0
        }
    }
}

/// Summary bucket for a successful outcome
fn outcome_bucket(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Status { code } => code.to_string(),
        Outcome::Redirect { redirected, .. } => {
            if *redirected {
                "redirected".to_string()
            } else {
                "direct".to_string()
            }
        }
        Outcome::Scheme { had_scheme, .. } => {
            if *had_scheme {
                "with scheme".to_string()
            } else {
                "without scheme".to_string()
            }
        }
        Outcome::Classify { sector, .. } => sector.clone(),
        Outcome::Dummy { is_dummy, .. } => {
            if *is_dummy {
                "dummy".to_string()
            } else {
                "live".to_string()
            }
        }
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &BatchSummary) {
    println!("=== Batch Summary ({}) ===\n", summary.kind);

    println!("Overview:");
    println!("  URLs in batch: {}", summary.total);
    println!("  Completed: {}", summary.completed);
    if summary.abandoned > 0 {
        println!("  Abandoned: {}", summary.abandoned);
    }
    println!("  Final state: {}", summary.state);
    println!("  Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    if let Some(output) = &summary.output {
        println!("  Output: {}", output);
    }
    println!();

    if !summary.succeeded.is_empty() {
        println!("Results:");
        for (label, count) in &summary.succeeded {
            println!("  {}: {}", label, count);
        }
        println!();
    }

    if !summary.failed.is_empty() {
        println!("Failures:");
        for (kind, count) in &summary.failed {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if summary.cancelled {
        println!("Batch was cancelled before all URLs were checked.");
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs answered)",
        summary.success_rate(),
        summary.succeeded_total(),
        summary.completed
    );
}
