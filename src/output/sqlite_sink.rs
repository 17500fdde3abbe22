//! SQLite result sink
//!
//! Each report is one autocommit `INSERT` with `synchronous = FULL`, so a
//! committed row survives a crash. The `runs` row is created on open and
//! closed by `finalize`.

use crate::output::schema::initialize_schema;
use crate::output::traits::{ResultSink, RunStatus, SinkError, SinkResult};
use crate::probe::{Outcome, ProbeKind, ProbeReport};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Separator used when storing redirect chains in one column
const CHAIN_SEPARATOR: &str = " -> ";

/// A batch run as stored in the `runs` table
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub probe_kind: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub records: u64,
}

/// SQLite sink
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    written: u64,
    status: RunStatus,
    finalized: bool,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and starts a new run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `kind` - Probe kind of the batch, stored with the run
    /// * `config_hash` - Hash of the configuration the batch runs with
    pub fn open(path: &Path, kind: ProbeKind, config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        let sink = Self::start_run(conn, kind, config_hash)?;
        tracing::debug!("Opened SQLite output {} (run {})", path.display(), sink.run_id);
        Ok(sink)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(kind: ProbeKind, config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::start_run(conn, kind, config_hash)
    }

    fn start_run(conn: Connection, kind: ProbeKind, config_hash: &str) -> SinkResult<Self> {
        initialize_schema(&conn)?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, probe_kind, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                kind.as_str(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            conn,
            run_id,
            written: 0,
            status: RunStatus::Completed,
            finalized: false,
        })
    }

    /// ID of the run this sink writes to
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Loads the run record this sink writes to
    pub fn run(&self) -> SinkResult<Option<RunRecord>> {
        load_run(&self.conn, self.run_id)
    }
}

impl ResultSink for SqliteSink {
    fn on_result(&mut self, report: &ProbeReport) -> SinkResult<()> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }

        let mut record = ResultColumns::default();
        match &report.result {
            Ok(outcome) => record.fill_outcome(outcome),
            Err(failure) => {
                record.error_kind = Some(failure.kind.as_str());
                record.error_message = Some(failure.message.clone());
            }
        }
        let outcome_label = match &report.result {
            Ok(outcome) => outcome.label(),
            Err(_) => "failure",
        };

        self.conn.execute(
            "INSERT INTO results (
                run_id, seq, task_id, original_url, normalized_url, outcome,
                status_code, redirected, final_url, redirect_chain, had_scheme, sector,
                confidence, is_dummy, matched_keyword, error_kind, error_message, recorded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                self.run_id,
                self.written as i64,
                report.task.id() as i64,
                report.task.original(),
                report.task.normalized(),
                outcome_label,
                record.status_code,
                record.redirected,
                record.final_url,
                record.redirect_chain,
                record.had_scheme,
                record.sector,
                record.confidence,
                record.is_dummy,
                record.matched_keyword,
                record.error_kind,
                record.error_message,
                Utc::now().to_rfc3339(),
            ],
        )?;

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

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records = ?3 WHERE id = ?4",
            params![
                self.status.to_db_string(),
                now,
                self.written as i64,
                self.run_id
            ],
        )?;
        self.finalized = true;

        tracing::debug!(
            "Closed run {} ({} records, {})",
            self.run_id,
            self.written,
            self.status.to_db_string()
        );
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}

/// Outcome-specific columns of a `results` row
#[derive(Debug, Default)]
struct ResultColumns {
    status_code: Option<u16>,
    redirected: Option<bool>,
    final_url: Option<String>,
    redirect_chain: Option<String>,
    had_scheme: Option<bool>,
    sector: Option<String>,
    confidence: Option<f64>,
    is_dummy: Option<bool>,
    matched_keyword: Option<String>,
    error_kind: Option<&'static str>,
    error_message: Option<String>,
}

impl ResultColumns {
    fn fill_outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Status { code } => self.status_code = Some(*code),
            Outcome::Redirect {
                redirected,
                chain,
                final_url,
            } => {
                self.redirected = Some(*redirected);
                self.final_url = Some(final_url.clone());
                self.redirect_chain = Some(chain.join(CHAIN_SEPARATOR));
            }
            Outcome::Scheme { had_scheme, .. } => self.had_scheme = Some(*had_scheme),
            Outcome::Classify { sector, confidence } => {
                self.sector = Some(sector.clone());
                self.confidence = Some(*confidence);
            }
            Outcome::Dummy { is_dummy, matched } => {
                self.is_dummy = Some(*is_dummy);
                self.matched_keyword = matched.clone();
            }
        }
    }
}

/// Loads one run record by ID
pub fn load_run(conn: &Connection, run_id: i64) -> SinkResult<Option<RunRecord>> {
    let run = conn
        .query_row(
            "SELECT id, started_at, finished_at, probe_kind, config_hash, status, records
             FROM runs WHERE id = ?1",
            params![run_id],
            |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    probe_kind: row.get(3)?,
                    config_hash: row.get(4)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                        .unwrap_or(RunStatus::Running),
                    records: row.get::<_, i64>(6)? as u64,
                })
            },
        )
        .optional()?;

    Ok(run)
}
