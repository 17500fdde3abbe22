//! Database schema for the SQLite result sink

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per batch
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    probe_kind TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    records INTEGER NOT NULL DEFAULT 0
);

-- One row per completed URL, in arrival order
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    seq INTEGER NOT NULL,
    task_id INTEGER NOT NULL,
    original_url TEXT NOT NULL,
    normalized_url TEXT NOT NULL,
    outcome TEXT NOT NULL,
    status_code INTEGER,
    redirected INTEGER,
    final_url TEXT,
    redirect_chain TEXT,
    had_scheme INTEGER,
    sector TEXT,
    confidence REAL,
    is_dummy INTEGER,
    matched_keyword TEXT,
    error_kind TEXT,
    error_message TEXT,
    recorded_at TEXT NOT NULL,
    UNIQUE(run_id, task_id)
);

CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id, seq);
CREATE INDEX IF NOT EXISTS idx_results_error ON results(error_kind);
"#;

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
