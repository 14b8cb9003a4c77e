//! Daily attendance ledger — one append-only CSV file per calendar date.
//!
//! Files are named `YYYY-MM-DD.csv` inside the configured directory and
//! start with the header `Name,Timestamp,Status`. Rows are only ever
//! appended. The files stay readable (and appendable) by spreadsheet tools,
//! so the reader tolerates hand edits: missing trailing newline, quoted
//! fields, rows with fewer columns.

use crate::types::{LedgerRow, ParsedRow, Status, TIME_FORMAT};
use chrono::{NaiveDate, NaiveTime};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HEADER: [&str; 3] = ["Name", "Timestamp", "Status"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const EXTENSION: &str = "csv";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("cannot create ledger directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read ledger {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot append to ledger {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Most recent ledger entry for an identity on a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastEntry {
    At(NaiveTime),
    /// The row exists but its timestamp column does not parse.
    Unparseable(String),
}

/// Handle to the ledger directory.
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
}

impl Ledger {
    /// Open the ledger directory, creating it if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| LedgerError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), "ledger directory ready");
        Ok(Self { dir })
    }

    /// Handle for reading an existing ledger directory. Touches nothing on
    /// disk; a missing directory reads as empty.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the ledger file for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", date.format(DATE_FORMAT)))
    }

    /// Latest entry for `identity` in the ledger for `date`.
    ///
    /// Every matching row counts, whatever its position: external tools may
    /// append out of order. If any matching timestamp does not parse the
    /// result is `Unparseable`, otherwise the greatest time wins. A missing
    /// file is `Ok(None)`.
    pub fn last_entry(
        &self,
        date: NaiveDate,
        identity: &str,
    ) -> Result<Option<LastEntry>, LedgerError> {
        let Some(records) = self.read_records(date)? else {
            return Ok(None);
        };

        let mut latest: Option<LastEntry> = None;
        for rec in records
            .iter()
            .filter(|rec| rec.first().map(|f| f.trim()) == Some(identity))
        {
            let raw = rec.get(1).map(|f| f.trim()).unwrap_or_default();
            latest = match (latest, NaiveTime::parse_from_str(raw, TIME_FORMAT)) {
                (Some(LastEntry::Unparseable(first_bad)), _) => {
                    Some(LastEntry::Unparseable(first_bad))
                }
                (_, Err(_)) => Some(LastEntry::Unparseable(raw.to_string())),
                (Some(LastEntry::At(prev)), Ok(t)) => Some(LastEntry::At(prev.max(t))),
                (None, Ok(t)) => Some(LastEntry::At(t)),
            };
        }
        Ok(latest)
    }

    /// All data rows of the ledger for `date`, header excluded.
    pub fn rows(&self, date: NaiveDate) -> Result<Vec<ParsedRow>, LedgerError> {
        let records = self.read_records(date)?.unwrap_or_default();
        Ok(records
            .into_iter()
            .map(|rec| {
                let raw_time = rec.get(1).map(|f| f.trim().to_string()).unwrap_or_default();
                ParsedRow {
                    identity: rec.first().map(|f| f.trim().to_string()).unwrap_or_default(),
                    time_of_day: NaiveTime::parse_from_str(&raw_time, TIME_FORMAT).ok(),
                    raw_time,
                    status: rec.get(2).and_then(|s| Status::parse(s)),
                }
            })
            .collect())
    }

    /// Dates that have a ledger file, oldest first. A missing directory
    /// has none.
    pub fn dates(&self) -> Result<Vec<NaiveDate>, LedgerError> {
        let read_err = |source: io::Error| LedgerError::Read {
            path: self.dir.clone(),
            source,
        };
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };
        let mut dates = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Append `row` to the ledger for `date`, writing the header first if
    /// the file is new or empty. The write is synced before returning.
    pub fn append(&self, date: NaiveDate, row: &LedgerRow) -> Result<(), LedgerError> {
        let path = self.path_for(date);
        let write_err = |source: io::Error| LedgerError::Write {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(write_err)?;

        let mut buf = String::new();
        let len = file.metadata().map_err(write_err)?.len();
        if len == 0 {
            push_record(&mut buf, &HEADER);
        } else if missing_trailing_newline(&path) {
            buf.push('\n');
        }
        let timestamp = row.timestamp();
        push_record(
            &mut buf,
            &[row.identity.as_str(), timestamp.as_str(), row.status.as_str()],
        );

        file.write_all(buf.as_bytes()).map_err(write_err)?;
        file.sync_data().map_err(write_err)?;
        Ok(())
    }

    /// Parsed records for `date` with the header dropped, or `None` if the
    /// file does not exist.
    fn read_records(&self, date: NaiveDate) -> Result<Option<Vec<Vec<String>>>, LedgerError> {
        let path = self.path_for(date);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LedgerError::Read { path, source }),
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut records = parse_records(&text);
        if records
            .first()
            .is_some_and(|r| r.iter().map(|f| f.trim()).eq(HEADER))
        {
            records.remove(0);
        }
        Ok(Some(records))
    }
}

/// True when the file's last byte is not a newline. An unreadable file is
/// left as is; appending must not depend on read access.
fn missing_trailing_newline(path: &Path) -> bool {
    let read_last = || -> io::Result<u8> {
        let mut file = fs::File::open(path)?;
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0])
    };
    matches!(read_last(), Ok(b) if b != b'\n')
}

/// Append one CSV record (with trailing newline) to `buf`.
fn push_record(buf: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            buf.push('"');
            buf.push_str(&field.replace('"', "\"\""));
            buf.push('"');
        } else {
            buf.push_str(field);
        }
    }
    buf.push('\n');
}

/// Split CSV text into records. Quoted fields may contain commas, doubled
/// quotes and line breaks. Blank lines are skipped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].trim().is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn row(name: &str, h: u32, m: u32, s: u32) -> LedgerRow {
        LedgerRow::present(
            &Identity::new(name).unwrap(),
            day().and_hms_opt(h, m, s).unwrap(),
        )
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data").join("logs");
        let ledger = Ledger::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(ledger.path_for(day()), dir.join("2024-03-01.csv"));
    }

    #[test]
    fn test_open_fails_when_path_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let err = Ledger::open(file.join("logs")).unwrap_err();
        assert!(matches!(err, LedgerError::CreateDir { .. }));
    }

    #[test]
    fn test_at_does_not_create_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("never-created");
        let ledger = Ledger::at(&dir);

        assert!(ledger.rows(day()).unwrap().is_empty());
        assert!(ledger.dates().unwrap().is_empty());
        assert_eq!(ledger.last_entry(day(), "Alice").unwrap(), None);
        assert!(!dir.exists());
    }

    #[test]
    fn test_append_writes_header_once() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        ledger.append(day(), &row("Alice", 9, 0, 0)).unwrap();
        ledger.append(day(), &row("Bob", 9, 5, 30)).unwrap();

        let text = fs::read_to_string(ledger.path_for(day())).unwrap();
        assert_eq!(
            text,
            "Name,Timestamp,Status\nAlice,09:00:00,Present\nBob,09:05:30,Present\n"
        );
    }

    #[test]
    fn test_append_repairs_missing_trailing_newline() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        fs::write(ledger.path_for(day()), "Name,Timestamp,Status\nCarol,08:00:00,Present").unwrap();
        ledger.append(day(), &row("Alice", 9, 0, 0)).unwrap();

        let rows = ledger.rows(day()).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(names, vec!["Carol", "Alice"]);
    }

    #[test]
    fn test_last_entry_missing_file() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        assert_eq!(ledger.last_entry(day(), "Alice").unwrap(), None);
    }

    #[test]
    fn test_last_entry_picks_most_recent_row() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        ledger.append(day(), &row("Alice", 9, 0, 0)).unwrap();
        ledger.append(day(), &row("Bob", 9, 10, 0)).unwrap();
        ledger.append(day(), &row("Alice", 9, 45, 0)).unwrap();

        assert_eq!(
            ledger.last_entry(day(), "Alice").unwrap(),
            Some(LastEntry::At(NaiveTime::from_hms_opt(9, 45, 0).unwrap()))
        );
        assert_eq!(ledger.last_entry(day(), "Dave").unwrap(), None);
    }

    #[test]
    fn test_last_entry_reports_unparseable_timestamp() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        fs::write(
            ledger.path_for(day()),
            "Name,Timestamp,Status\nAlice,9 o'clock,Present\nBob\n",
        )
        .unwrap();

        assert_eq!(
            ledger.last_entry(day(), "Alice").unwrap(),
            Some(LastEntry::Unparseable("9 o'clock".into()))
        );
        assert_eq!(
            ledger.last_entry(day(), "Bob").unwrap(),
            Some(LastEntry::Unparseable(String::new()))
        );
    }

    #[test]
    fn test_last_entry_uses_latest_time_not_file_order() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        fs::write(
            ledger.path_for(day()),
            "Name,Timestamp,Status\nAlice,10:00:00,Present\nBob,11:00:00,Present\nAlice,09:00:00,Present\n",
        )
        .unwrap();

        assert_eq!(
            ledger.last_entry(day(), "Alice").unwrap(),
            Some(LastEntry::At(NaiveTime::from_hms_opt(10, 0, 0).unwrap()))
        );
    }

    #[test]
    fn test_last_entry_unparseable_anywhere_wins() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        fs::write(
            ledger.path_for(day()),
            "Name,Timestamp,Status\nAlice,garbage,Present\nAlice,09:00:00,Present\nAlice,late,Present\n",
        )
        .unwrap();

        assert_eq!(
            ledger.last_entry(day(), "Alice").unwrap(),
            Some(LastEntry::Unparseable("garbage".into()))
        );
    }

    #[test]
    fn test_header_name_is_not_an_identity() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        ledger.append(day(), &row("Alice", 9, 0, 0)).unwrap();
        assert_eq!(ledger.last_entry(day(), "Name").unwrap(), None);
    }

    #[test]
    fn test_quoted_identity_round_trips() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        ledger.append(day(), &row("Hopper, Grace \"Amazing\"", 9, 0, 0)).unwrap();

        let text = fs::read_to_string(ledger.path_for(day())).unwrap();
        assert!(text.contains("\"Hopper, Grace \"\"Amazing\"\"\",09:00:00,Present"));
        assert!(matches!(
            ledger.last_entry(day(), "Hopper, Grace \"Amazing\"").unwrap(),
            Some(LastEntry::At(_))
        ));
    }

    #[test]
    fn test_rows_tolerates_legacy_two_column_rows() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        fs::write(ledger.path_for(day()), "Alice,09:00:00\r\n\r\nBob,bogus,Present\r\n").unwrap();

        let rows = ledger.rows(day()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time_of_day, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(rows[0].status, None);
        assert_eq!(rows[1].time_of_day, None);
        assert_eq!(rows[1].raw_time, "bogus");
        assert_eq!(rows[1].status, Some(Status::Present));
    }

    #[test]
    fn test_dates_ignores_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::open(tmp.path()).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        ledger.append(later, &row("Alice", 9, 0, 0)).unwrap();
        ledger.append(day(), &row("Alice", 9, 0, 0)).unwrap();
        fs::write(tmp.path().join("notes.txt"), "hi").unwrap();
        fs::write(tmp.path().join("backup.csv"), "x").unwrap();

        assert_eq!(ledger.dates().unwrap(), vec![day(), later]);
    }
}
