use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Label the recognition engine emits for a face that matched nobody.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Wire format for the time-of-day column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,
    #[error("\"{UNKNOWN_LABEL}\" is the unmatched sentinel, not an identity")]
    Sentinel,
}

/// A recognized person's label, guaranteed non-empty and not the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(label: &str) -> Result<Self, IdentityError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(IdentityError::Empty);
        }
        if label == UNKNOWN_LABEL {
            return Err(IdentityError::Sentinel);
        }
        Ok(Self(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attendance status column. Only `Present` is ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Present,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "Present",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Present" => Some(Status::Present),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted attendance row in a daily ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub identity: String,
    #[serde(serialize_with = "serialize_time")]
    pub time_of_day: NaiveTime,
    pub status: Status,
}

impl LedgerRow {
    pub fn present(identity: &Identity, at: NaiveDateTime) -> Self {
        Self {
            identity: identity.as_str().to_string(),
            time_of_day: truncate_to_seconds(at.time()),
            status: Status::Present,
        }
    }

    pub fn timestamp(&self) -> String {
        self.time_of_day.format(TIME_FORMAT).to_string()
    }
}

/// A row read back from a ledger, kept even when its columns are malformed.
///
/// External tools may append to the ledger, so the reader never drops a
/// row just because its timestamp or status does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRow {
    pub identity: String,
    #[serde(serialize_with = "serialize_opt_time")]
    pub time_of_day: Option<NaiveTime>,
    /// Timestamp column as it appears in the file.
    pub raw_time: String,
    pub status: Option<Status>,
}

/// Why an event did not produce a new ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    /// In-memory cache says the identity was accepted within the cooldown.
    Cooldown { since: NaiveDateTime },
    /// Cache was cold but today's ledger has a row within the cooldown.
    Recovered { since: NaiveDateTime },
    /// Latest ledger row for the identity has a timestamp that does not parse.
    UnreadableTimestamp { raw: String },
    /// Appending the row failed; nothing was recorded.
    WriteFailed { reason: String },
    /// Input was empty or the unmatched sentinel.
    NotLoggable,
}

impl fmt::Display for Suppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suppression::Cooldown { since } => write!(f, "cooling down since {}", since.time()),
            Suppression::Recovered { since } => {
                write!(f, "already in ledger at {}", since.time())
            }
            Suppression::UnreadableTimestamp { raw } => {
                write!(f, "ledger timestamp {raw:?} unreadable")
            }
            Suppression::WriteFailed { reason } => write!(f, "write failed: {reason}"),
            Suppression::NotLoggable => f.write_str("not a loggable identity"),
        }
    }
}

/// Result of [`AttendanceRecorder::record`](crate::AttendanceRecorder::record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted(LedgerRow),
    Suppressed(Suppression),
}

impl RecordOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RecordOutcome::Accepted(_))
    }
}

/// Ledger timestamps have one-second resolution; match that in memory so a
/// cached timestamp and its ledger row compare equal.
pub(crate) fn truncate_to_seconds(t: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    t.with_nanosecond(0).unwrap_or(t)
}

fn serialize_time<S: serde::Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&t.format(TIME_FORMAT))
}

fn serialize_opt_time<S: serde::Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => s.collect_str(&t.format(TIME_FORMAT)),
        None => s.serialize_none(),
    }
}
