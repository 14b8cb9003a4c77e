use crate::cache::CooldownCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::ledger::{LastEntry, Ledger, LedgerError};
use crate::recognizer::{loggable_identities, Recognition};
use crate::types::{Identity, LedgerRow, RecordOutcome, Suppression};
use chrono::Duration;

/// Records at most one attendance row per identity per cooldown window.
///
/// The cache answers repeat sightings without I/O. On a cache miss the
/// day's ledger is consulted, so a restarted process (cold cache) does not
/// append a duplicate for someone already logged. Per-event failures never
/// escape: they come back as [`Suppression`] and are logged.
///
/// Check-then-append is not atomic. One recorder must own a ledger
/// directory; share it across cameras through a single-writer handle
/// rather than constructing several.
pub struct AttendanceRecorder {
    ledger: Ledger,
    cooldown: Duration,
    cache: CooldownCache,
    clock: Box<dyn Clock>,
}

impl AttendanceRecorder {
    pub fn new(ledger: Ledger, cooldown: Duration) -> Self {
        Self::with_clock(ledger, cooldown, SystemClock)
    }

    pub fn with_clock(ledger: Ledger, cooldown: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            ledger,
            cooldown,
            cache: CooldownCache::new(),
            clock: Box::new(clock),
        }
    }

    /// Open the configured ledger directory (creating it) and build a recorder.
    pub fn open(config: &Config) -> Result<Self, LedgerError> {
        let ledger = Ledger::open(&config.log_dir)?;
        tracing::info!(
            dir = %config.log_dir.display(),
            cooldown_secs = config.cooldown.num_seconds(),
            "attendance recorder ready"
        );
        Ok(Self::new(ledger, config.cooldown))
    }

    /// Record a sighting of `label`.
    ///
    /// Empty labels and the unmatched sentinel are refused as `NotLoggable`.
    pub fn record(&mut self, label: &str) -> RecordOutcome {
        match Identity::new(label) {
            Ok(identity) => self.record_identity(identity),
            Err(e) => {
                tracing::debug!(label, error = %e, "label not loggable");
                RecordOutcome::Suppressed(Suppression::NotLoggable)
            }
        }
    }

    pub fn record_identity(&mut self, identity: Identity) -> RecordOutcome {
        let now = self.clock.now();

        if let Some(since) = self.cache.is_cooling(&identity, now, self.cooldown) {
            tracing::trace!(identity = %identity, since = %since.time(), "suppressed by cache");
            return RecordOutcome::Suppressed(Suppression::Cooldown { since });
        }

        let today = now.date();
        match self.ledger.last_entry(today, identity.as_str()) {
            Ok(Some(LastEntry::At(time))) => {
                let since = today.and_time(time);
                if now - since < self.cooldown {
                    tracing::debug!(
                        identity = %identity,
                        since = %time,
                        "already in today's ledger; cache reconciled"
                    );
                    self.cache.insert(identity, since);
                    return RecordOutcome::Suppressed(Suppression::Recovered { since });
                }
            }
            Ok(Some(LastEntry::Unparseable(raw))) => {
                // Unknown last time: suppress rather than risk a duplicate.
                tracing::warn!(
                    identity = %identity,
                    raw = %raw,
                    "ledger timestamp unparseable; treating as within cooldown"
                );
                return RecordOutcome::Suppressed(Suppression::UnreadableTimestamp { raw });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "ledger unreadable; treating identity as not yet recorded"
                );
            }
        }

        let row = LedgerRow::present(&identity, now);
        if let Err(e) = self.ledger.append(today, &row) {
            tracing::error!(identity = %identity, error = %e, "failed to record attendance");
            return RecordOutcome::Suppressed(Suppression::WriteFailed {
                reason: e.to_string(),
            });
        }

        tracing::info!(identity = %identity, time = %row.timestamp(), "attendance recorded");
        self.cache.insert(identity, today.and_time(row.time_of_day));
        RecordOutcome::Accepted(row)
    }

    /// Record every loggable identity in one recognized frame, in order.
    pub fn record_frame(&mut self, recognitions: &[Recognition]) -> Vec<(Identity, RecordOutcome)> {
        loggable_identities(recognitions)
            .into_iter()
            .map(|identity| {
                let outcome = self.record_identity(identity.clone());
                (identity, outcome)
            })
            .collect()
    }

    /// Forget every cached timestamp. The ledger is untouched.
    pub fn clear_cache(&mut self) {
        let dropped = self.cache.len();
        self.cache.clear();
        tracing::info!(dropped, "cooldown cache cleared");
    }

    pub fn cached_identities(&self) -> usize {
        self.cache.len()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
