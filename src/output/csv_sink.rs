//! Append-only CSV result sink
//!
//! Every row is serialized into a buffer first and written with a single
//! `write_all`, then flushed and synced to disk before `on_result` returns.
//! A failed append truncates the file back to where the row started, so the
//! file only ever holds complete records.

use crate::output::columns::{header, row};
use crate::output::traits::{ResultSink, RunStatus, SinkError, SinkResult};
use crate::probe::{ProbeKind, ProbeReport};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file the sink can sync and truncate
pub trait SinkFile: Write + Seek + Send {
    fn sync_data(&self) -> io::Result<()>;
    fn sync_all(&self) -> io::Result<()>;
    fn set_len(&self, len: u64) -> io::Result<()>;
}

impl SinkFile for File {
    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// CSV file sink
#[derive(Debug)]
pub struct CsvSink<F: SinkFile = File> {
    file: F,
    path: PathBuf,
    kind: ProbeKind,
    written: u64,
    status: RunStatus,
    finalized: bool,
}

impl CsvSink {
    /// Creates (or truncates) the file at `path` and writes the header row
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - File created and header persisted
    /// * `Err(SinkError)` - The file could not be created or written
    pub fn create(path: &Path, kind: ProbeKind) -> SinkResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let sink = Self::from_file(file, path, kind)?;
        tracing::debug!("Opened CSV output {}", path.display());
        Ok(sink)
    }
}

impl<F: SinkFile> CsvSink<F> {
    /// Wraps an already opened, empty file and writes the header row
    pub fn from_file(file: F, path: &Path, kind: ProbeKind) -> SinkResult<Self> {
        let mut sink = Self {
            file,
            path: path.to_path_buf(),
            kind,
            written: 0,
            status: RunStatus::Completed,
            finalized: false,
        };
        sink.append(header(kind))?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append<I, T>(&mut self, record: I) -> SinkResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut buffer = csv::Writer::from_writer(Vec::new());
        buffer.write_record(record)?;
        let bytes = buffer.into_inner().map_err(|e| e.into_error())?;

        let start = self.file.stream_position()?;
        if let Err(e) = self.write_synced(&bytes) {
            if let Err(rollback) = self.truncate_to(start) {
                tracing::warn!(
                    "Could not roll back partial row in {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn write_synced(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.file.sync_data()
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

impl<F: SinkFile> ResultSink for CsvSink<F> {
    fn on_result(&mut self, report: &ProbeReport) -> SinkResult<()> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }

        self.append(row(self.kind, report))?;
        self.written += 1;
        Ok(())
    }

    fn mark_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    fn finalize(&mut self) -> SinkResult<()> {
        if self.finalized {
            return Ok(());
        }

        self.file.flush()?;
        self.file.sync_all()?;
        self.finalized = true;

        tracing::debug!(
            "Closed CSV output {} ({} records, {})",
            self.path.display(),
            self.written,
            self.status.to_db_string()
        );
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}
