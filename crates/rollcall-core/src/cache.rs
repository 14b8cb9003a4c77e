//! In-memory cooldown cache: identity → last accepted time.
//!
//! Only an optimization in front of the ledger. It starts empty, fills
//! lazily as events are accepted or reconciled, and is never preloaded.

use crate::types::Identity;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CooldownCache {
    entries: HashMap<Identity, NaiveDateTime>,
}

impl CooldownCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &Identity) -> Option<NaiveDateTime> {
        self.entries.get(identity).copied()
    }

    pub fn insert(&mut self, identity: Identity, at: NaiveDateTime) {
        self.entries.insert(identity, at);
    }

    /// Returns the cached time if `identity` is still inside `cooldown` at `now`.
    pub fn is_cooling(
        &self,
        identity: &Identity,
        now: NaiveDateTime,
        cooldown: Duration,
    ) -> Option<NaiveDateTime> {
        self.get(identity).filter(|&last| now - last < cooldown)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
