//! SQLite run history
//!
//! Stores every run, its case results and each attempt so flaky cases can be
//! found across runs. Uses WAL mode so a reader can query while a run writes.

use rusqlite::{Connection, Result, params};
use std::path::Path;

use crate::report::{CaseReport, RunSummary};

/// Database wrapper for run history
pub struct HistoryDatabase {
    conn: Connection,
}

/// One row of the runs table
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub passed: bool,
    pub cases: u32,
}

/// Case that needed retries to pass, aggregated over all runs
#[derive(Debug, Clone, PartialEq)]
pub struct FlakyCase {
    pub case_id: String,
    /// Runs where the case passed only after a failed attempt
    pub flaky_runs: u32,
    pub total_runs: u32,
}

impl FlakyCase {
    pub fn flake_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.flaky_runs as f64 / self.total_runs as f64
        }
    }
}

impl HistoryDatabase {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                passed INTEGER NOT NULL,
                config_json TEXT
            );

            CREATE TABLE IF NOT EXISTS case_results (
                id INTEGER PRIMARY KEY,
                run_id TEXT REFERENCES runs(id),
                case_id TEXT NOT NULL,
                batch TEXT NOT NULL,
                required INTEGER NOT NULL,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY,
                case_result_id INTEGER REFERENCES case_results(id),
                attempt INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                tick INTEGER,
                reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_case_results_run ON case_results(run_id);
            CREATE INDEX IF NOT EXISTS idx_case_results_case ON case_results(case_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_case_result ON attempts(case_result_id);
            "#,
        )?;
        Ok(())
    }

    /// Store a finished run with all its cases and attempts
    pub fn record_run(&mut self, summary: &RunSummary, config_json: Option<&str>) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (id, started_at, finished_at, passed, config_json) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                summary.run_id,
                summary.started_at,
                summary.finished_at,
                summary.passed(),
                config_json
            ],
        )?;
        for case in &summary.cases {
            insert_case(&tx, &summary.run_id, case)?;
        }
        tx.commit()
    }

    /// Most recent runs first
    pub fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT r.id, r.started_at, r.finished_at, r.passed,
                      (SELECT COUNT(*) FROM case_results c WHERE c.run_id = r.id)
               FROM runs r
               ORDER BY r.started_at DESC
               LIMIT ?1"#,
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(RunRecord {
                id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                passed: row.get(3)?,
                cases: row.get(4)?,
            })
        })?;

        rows.collect()
    }

    /// Cases that passed after retries in at least one run
    pub fn flaky_cases(&self) -> Result<Vec<FlakyCase>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT case_id,
                      SUM(CASE WHEN status = 'PASS' AND attempts > 1 THEN 1 ELSE 0 END) AS flaky,
                      COUNT(*) AS total
               FROM case_results
               GROUP BY case_id
               HAVING flaky > 0
               ORDER BY flaky DESC, case_id"#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(FlakyCase {
                case_id: row.get(0)?,
                flaky_runs: row.get(1)?,
                total_runs: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    pub fn run_count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
    }

    pub fn attempt_count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))
    }
}

fn insert_case(conn: &Connection, run_id: &str, case: &CaseReport) -> Result<()> {
    conn.execute(
        r#"INSERT INTO case_results (run_id, case_id, batch, required, status, attempts)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![
            run_id,
            case.id,
            case.batch,
            case.required,
            case.status_label(),
            case.attempts.len() as u32
        ],
    )?;
    let case_result_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO attempts (case_result_id, attempt, outcome, tick, reason) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for record in &case.attempts {
        stmt.execute(params![
            case_result_id,
            record.attempt,
            record.outcome.label(),
            record.outcome.tick().map(|t| t as i64),
            record.outcome.reason()
        ])?;
    }
    Ok(())
}
