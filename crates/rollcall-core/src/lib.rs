//! rollcall-core — Deduplicated attendance recording.
//!
//! Turns a stream of recognized identities into at most one ledger row
//! per identity per cooldown window. Ledgers are plain daily CSV files
//! that double as the recovery source when the in-memory cache is cold.

pub mod cache;
pub mod clock;
pub mod config;
pub mod ledger;
pub mod recognizer;
pub mod recorder;
pub mod summary;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use ledger::{Ledger, LedgerError};
pub use recognizer::{Label, Recognition, Recognizer, Region};
pub use recorder::AttendanceRecorder;
pub use summary::{summarize, IdentitySummary};
pub use types::{Identity, LedgerRow, ParsedRow, RecordOutcome, Status, Suppression};
