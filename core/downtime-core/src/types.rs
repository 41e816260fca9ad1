//! Core stoppage types.
//!
//! A stoppage is either open ([`Stoppage`]) or closed ([`ClosedStoppage`]).
//! The split makes "end time and duration are set together, exactly once"
//! a property of the types: the only way to obtain a closed record is
//! [`Stoppage::close`], which consumes the open one.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::catalog::Process;
use crate::error::{DowntimeError, Result};

/// Timestamp layout used by the active-stoppage side file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Date layout of the history table's first column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day layout of the history table's start/end columns.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Formats a timestamp the way the side file stores it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a side-file timestamp. Fractional seconds are tolerated.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| DowntimeError::InvalidTimestamp {
            value: value.to_string(),
            format: TIMESTAMP_FORMAT,
        })
}

/// An open stoppage: a production process is currently halted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stoppage {
    pub id: String,
    pub employee: String,
    pub process: Process,
    pub reason: String,
    pub started_at: NaiveDateTime,
}

impl Stoppage {
    /// Builds an open stoppage with a fresh ULID.
    ///
    /// The reason is expected to be resolved against the catalog already.
    pub fn new(employee: &str, process: Process, reason: &str, now: NaiveDateTime) -> Self {
        Stoppage {
            id: ulid::Ulid::new().to_string(),
            employee: employee.to_string(),
            process,
            reason: reason.to_string(),
            started_at: now,
        }
    }

    /// Minutes elapsed between the start and `now`, never negative.
    pub fn elapsed_minutes(&self, now: NaiveDateTime) -> f64 {
        minutes_between(self.started_at, now)
    }

    /// Ends the stoppage at `now`.
    ///
    /// A clock that moved backwards would produce a negative interval; the
    /// end is clamped to the start in that case so the duration stays >= 0.
    pub fn close(self, now: NaiveDateTime) -> ClosedStoppage {
        let ended_at = if now < self.started_at {
            tracing::warn!(
                id = %self.id,
                started_at = %format_timestamp(&self.started_at),
                now = %format_timestamp(&now),
                "Close time precedes start time; clamping to start"
            );
            self.started_at
        } else {
            now
        };
        let duration_minutes = minutes_between(self.started_at, ended_at);

        ClosedStoppage {
            id: self.id,
            employee: self.employee,
            process: self.process,
            reason: self.reason,
            started_at: self.started_at,
            ended_at,
            duration_minutes,
        }
    }
}

/// A finished stoppage, ready to be appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedStoppage {
    pub id: String,
    pub employee: String,
    pub process: Process,
    pub reason: String,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    /// Fractional minutes, not rounded.
    pub duration_minutes: f64,
}

fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta: TimeDelta = end - start;
    delta
        .to_std()
        .map(|d| d.as_secs_f64() / 60.0)
        .unwrap_or(0.0)
}
