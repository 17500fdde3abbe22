//! Output module: durable result sinks and batch summaries
//!
//! This module handles:
//! - The [`ResultSink`] trait and its CSV, SQLite, and in-memory implementations
//! - Column layout of the result table per probe kind
//! - Batch summaries printed to stdout or written as markdown

mod columns;
mod csv_sink;
mod markdown;
mod schema;
mod sqlite_sink;
pub mod stats;
mod traits;

pub use columns::{header, row};
pub use csv_sink::{CsvSink, SinkFile};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_sink::{load_run, RunRecord, SqliteSink};
pub use stats::{print_summary, BatchSummary};
pub use traits::{MemorySink, ResultSink, RunStatus, SinkError, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use crate::probe::ProbeKind;
use std::path::{Path, PathBuf};

/// Where a batch writes its results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Csv(PathBuf),
    Sqlite(PathBuf),
}

impl OutputTarget {
    pub fn from_config(config: &OutputConfig) -> Self {
        let path = PathBuf::from(&config.path);
        match config.format {
            OutputFormat::Csv => Self::Csv(path),
            OutputFormat::Sqlite => Self::Sqlite(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Csv(path) | Self::Sqlite(path) => path,
        }
    }

    /// Opens the sink for this target
    ///
    /// # Arguments
    ///
    /// * `kind` - Probe kind of the batch (selects the CSV columns)
    /// * `config_hash` - Recorded with SQLite runs
    pub fn open(&self, kind: ProbeKind, config_hash: &str) -> SinkResult<Box<dyn ResultSink>> {
        let sink: Box<dyn ResultSink> = match self {
            Self::Csv(path) => Box::new(CsvSink::create(path, kind)?),
            Self::Sqlite(path) => Box::new(SqliteSink::open(path, kind, config_hash)?),
        };
        Ok(sink)
    }
}
