//! Per-identity roll-up of one day's ledger.

use crate::types::ParsedRow;
use chrono::NaiveTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySummary {
    pub identity: String,
    pub rows: usize,
    /// Earliest parseable timestamp, if any.
    pub first: Option<NaiveTime>,
    /// Latest parseable timestamp, if any.
    pub last: Option<NaiveTime>,
    /// Rows whose timestamp did not parse.
    pub unreadable: usize,
}

/// Group rows by identity, ordered by first appearance in the ledger.
pub fn summarize(rows: &[ParsedRow]) -> Vec<IdentitySummary> {
    let mut out: Vec<IdentitySummary> = Vec::new();
    for row in rows {
        let idx = match out.iter().position(|s| s.identity == row.identity) {
            Some(i) => i,
            None => {
                out.push(IdentitySummary {
                    identity: row.identity.clone(),
                    rows: 0,
                    first: None,
                    last: None,
                    unreadable: 0,
                });
                out.len() - 1
            }
        };
        let entry = &mut out[idx];
        entry.rows += 1;
        match row.time_of_day {
            Some(t) => {
                entry.first = Some(entry.first.map_or(t, |f| f.min(t)));
                entry.last = Some(entry.last.map_or(t, |l| l.max(t)));
            }
            None => entry.unreadable += 1,
        }
    }
    out
}
