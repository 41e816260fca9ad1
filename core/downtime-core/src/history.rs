//! History store: the append-only table of closed stoppages.
//!
//! Backed by a single SQLite file (`paradas.db`) in the operator-chosen
//! storage directory. Every operation opens the file, does its work and
//! closes it again; there is no long-lived handle.
//!
//! The table has seven logical columns (see [`HISTORY_HEADER`]). All of them
//! are nullable so that partially written or imported legacy rows can still
//! be read; the aggregator decides what to skip. Rows whose date column holds
//! `TOTAL` are summary rows left by an older export and are never returned.

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};

use crate::error::{DowntimeError, Result};
use crate::types::{ClosedStoppage, DATE_FORMAT, TIME_FORMAT};

/// Name of the history table.
pub const HISTORY_TABLE: &str = "Paradas";

/// Column headers in storage order.
pub const HISTORY_HEADER: [&str; 7] = [
    "Date",
    "Process",
    "Employee",
    "Reason",
    "Start",
    "End",
    "Duration (min)",
];

const LEGACY_TOTAL_MARKER: &str = "TOTAL";

/// One stored history row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryRow {
    pub date: Option<String>,
    pub process: Option<String>,
    pub employee: Option<String>,
    pub reason: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration_minutes: Option<f64>,
}

impl HistoryRow {
    fn from_closed(closed: &ClosedStoppage) -> Self {
        HistoryRow {
            date: Some(closed.started_at.format(DATE_FORMAT).to_string()),
            process: Some(closed.process.name().to_string()),
            employee: Some(closed.employee.clone()),
            reason: Some(closed.reason.clone()),
            start: Some(closed.started_at.format(TIME_FORMAT).to_string()),
            end: Some(closed.ended_at.format(TIME_FORMAT).to_string()),
            duration_minutes: Some(closed.duration_minutes),
        }
    }

    fn is_legacy_total(&self) -> bool {
        self.date.as_deref() == Some(LEGACY_TOTAL_MARKER)
    }
}

impl fmt::Display for HistoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        writeln!(f, "Data: {}", text(&self.date))?;
        writeln!(f, "Processo: {}", text(&self.process))?;
        writeln!(f, "Motivo: {}", text(&self.reason))?;
        match self.duration_minutes {
            Some(minutes) => write!(
                f,
                "Duração: {:.2} min ({} - {})",
                minutes,
                text(&self.start),
                text(&self.end)
            ),
            None => write!(f, "Duração: - ({} - {})", text(&self.start), text(&self.end)),
        }
    }
}

/// Handle on the history table file. Cheap to construct; holds no connection.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file exists and contains the history table.
    ///
    /// A wiped or never-created history reports `false`; an existing table
    /// with no rows reports `true`.
    pub fn exists(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let conn = self.open_read_only()?;
        table_exists(&conn).map_err(|e| DowntimeError::history(&self.path, e))
    }

    /// Appends one closed stoppage, creating the file and table if needed.
    pub fn append(&self, closed: &ClosedStoppage) -> Result<()> {
        let row = HistoryRow::from_closed(closed);
        let mut conn = self.open_read_write()?;

        let tx = conn
            .transaction()
            .map_err(|e| DowntimeError::history(&self.path, e))?;
        tx.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| DowntimeError::history(&self.path, e))?;
        tx.execute(
            "INSERT INTO Paradas (date, process, employee, reason, start_time, end_time, duration_min) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.date,
                row.process,
                row.employee,
                row.reason,
                row.start,
                row.end,
                row.duration_minutes
            ],
        )
        .map_err(|e| DowntimeError::history(&self.path, e))?;
        tx.commit()
            .map_err(|e| DowntimeError::history(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), id = %closed.id, "Appended history row");
        Ok(())
    }

    /// Streams every stored row in append order to `visit`.
    ///
    /// Returns `false` without calling `visit` when the table does not exist.
    /// The file is opened read-only, so a missing history is never created
    /// as a side effect.
    pub fn for_each_row(&self, mut visit: impl FnMut(HistoryRow)) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let conn = self.open_read_only()?;
        let map_err = |e| DowntimeError::history(&self.path, e);

        if !table_exists(&conn).map_err(map_err)? {
            return Ok(false);
        }

        let mut stmt = conn
            .prepare(
                "SELECT date, process, employee, reason, start_time, end_time, duration_min \
                 FROM Paradas ORDER BY rowid ASC",
            )
            .map_err(map_err)?;
        let mut rows = stmt.query([]).map_err(map_err)?;

        while let Some(row) = rows.next().map_err(map_err)? {
            let record = HistoryRow {
                date: text_column(row, 0).map_err(map_err)?,
                process: text_column(row, 1).map_err(map_err)?,
                employee: text_column(row, 2).map_err(map_err)?,
                reason: text_column(row, 3).map_err(map_err)?,
                start: text_column(row, 4).map_err(map_err)?,
                end: text_column(row, 5).map_err(map_err)?,
                duration_minutes: number_column(row, 6).map_err(map_err)?,
            };
            if record.is_legacy_total() {
                continue;
            }
            visit(record);
        }

        Ok(true)
    }

    /// Collects every stored row. Empty when the table does not exist.
    pub fn scan(&self) -> Result<Vec<HistoryRow>> {
        let mut rows = Vec::new();
        self.for_each_row(|row| rows.push(row))?;
        Ok(rows)
    }

    /// Deletes the whole history. Returns `false` if there was nothing to delete.
    pub fn wipe(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs_err::remove_file(&self.path)
            .map_err(|e| DowntimeError::io("deleting history table", e))?;

        let journal = journal_path(&self.path);
        if journal.exists() {
            fs_err::remove_file(&journal)
                .map_err(|e| DowntimeError::io("deleting history journal", e))?;
        }

        tracing::info!(path = %self.path.display(), "History wiped");
        Ok(true)
    }

    fn open_read_write(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            crate::storage::ensure_dir(parent)?;
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| DowntimeError::history(&self.path, e))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| DowntimeError::history(&self.path, e))?;
        Ok(conn)
    }

    fn open_read_only(&self) -> Result<Connection> {
        Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| DowntimeError::history(&self.path, e))
    }
}

/// Stored columns in [`HISTORY_HEADER`] order: `date` = Date, `process` =
/// Process, `employee` = Employee, `reason` = Reason, `start_time` = Start,
/// `end_time` = End, `duration_min` = Duration (min).
const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS Paradas (
    date TEXT,
    process TEXT,
    employee TEXT,
    reason TEXT,
    start_time TEXT,
    end_time TEXT,
    duration_min REAL
);";

fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![HISTORY_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn journal_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-journal");
    PathBuf::from(name)
}

fn text_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get::<_, Value>(index)? {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    })
}

// Imported rows may carry the duration as text.
fn number_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get::<_, Value>(index)? {
        Value::Integer(i) => Some(i as f64),
        Value::Real(f) => Some(f),
        Value::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Value::Null | Value::Blob(_) => None,
    })
}
