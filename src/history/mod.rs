pub mod store;

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::record::{RecordType, Verdict};

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

pub const HISTORY_KEY: &str = "searchHistory";
pub const STATS_KEY: &str = "searchStats";
pub const MAX_HISTORY_ITEMS: usize = 15;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub result: String,
    pub timestamp: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_bulk: bool,
}

pub fn outcome_label(verdict: Verdict) -> &'static str {
    if verdict.is_found() {
        "Found"
    } else {
        "Not Found"
    }
}

/// Most-recent-first log of lookups, capped at [`MAX_HISTORY_ITEMS`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids are millisecond timestamps, bumped when two inserts land in the
    /// same millisecond.
    fn next_id(&self) -> i64 {
        let now = Local::now().timestamp_millis();
        match self.entries.first() {
            Some(latest) if latest.id >= now => latest.id + 1,
            _ => now,
        }
    }

    /// Records a single lookup. An older entry with the same type and value
    /// is removed first.
    pub fn insert_single(&mut self, record_type: RecordType, value: &str, verdict: Verdict) {
        let kind = record_type.key();
        self.entries
            .retain(|e| !(e.kind == kind && e.value == value));
        let entry = HistoryEntry {
            kind: kind.to_string(),
            value: value.to_string(),
            result: outcome_label(verdict).to_string(),
            timestamp: crate::report::timestamp_now(),
            id: self.next_id(),
            is_bulk: false,
        };
        self.push_front(entry);
    }

    /// Records a finished batch run. Batch entries are never deduplicated.
    pub fn insert_bulk(&mut self, record_type: RecordType, total: usize, found: usize) {
        let entry = HistoryEntry {
            kind: format!("bulk-{}", record_type.key()),
            value: format!("{total} {} numbers", record_type.key()),
            result: format!("Found: {found}, Not Found: {}", total.saturating_sub(found)),
            timestamp: crate::report::timestamp_now(),
            id: self.next_id(),
            is_bulk: true,
        };
        self.push_front(entry);
    }

    fn push_front(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY_ITEMS);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    pub successful: u64,
    /// Cumulative latency in milliseconds.
    pub response_time: u64,
}

impl Statistics {
    pub fn record(&mut self, attempts: u64, successful: u64, latency_ms: u64) {
        self.total = self.total.saturating_add(attempts);
        self.successful = self.successful.saturating_add(successful);
        self.response_time = self.response_time.saturating_add(latency_ms);
    }

    /// Whole percent; 100 before any attempt.
    pub fn success_rate(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        ((self.successful as f64 / self.total as f64) * 100.0).round() as u64
    }

    pub fn average_latency_ms(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (self.response_time as f64 / self.total as f64).round() as u64
    }
}

/// History and statistics persisted through a [`KeyValueStore`]. Every
/// mutation reads the stored value, applies the update and writes it back
/// whole.
#[derive(Clone)]
pub struct Journal {
    store: Arc<dyn KeyValueStore>,
}

impl Journal {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: Default + for<'de> Deserialize<'de>,
    {
        match self.store.get(key)? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(|e| StoreError::Decode {
                    key: key.to_string(),
                    source: e,
                })
            }
            _ => Ok(T::default()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        self.store.set(key, &raw)
    }

    pub fn history(&self) -> Result<HistoryLedger, StoreError> {
        self.load(HISTORY_KEY)
    }

    pub fn statistics(&self) -> Result<Statistics, StoreError> {
        self.load(STATS_KEY)
    }

    pub fn update_history<F>(&self, update: F) -> Result<HistoryLedger, StoreError>
    where
        F: FnOnce(&mut HistoryLedger),
    {
        let mut ledger = self.history()?;
        update(&mut ledger);
        self.save(HISTORY_KEY, &ledger)?;
        Ok(ledger)
    }

    pub fn record_lookup(
        &self,
        record_type: RecordType,
        value: &str,
        verdict: Verdict,
    ) -> Result<(), StoreError> {
        self.update_history(|ledger| ledger.insert_single(record_type, value, verdict))
            .map(|_| ())
    }

    pub fn record_bulk(
        &self,
        record_type: RecordType,
        total: usize,
        found: usize,
    ) -> Result<(), StoreError> {
        self.update_history(|ledger| ledger.insert_bulk(record_type, total, found))
            .map(|_| ())
    }

    pub fn record_attempts(
        &self,
        attempts: u64,
        successful: u64,
        latency_ms: u64,
    ) -> Result<Statistics, StoreError> {
        let mut stats = self.statistics()?;
        stats.record(attempts, successful, latency_ms);
        self.save(STATS_KEY, &stats)?;
        Ok(stats)
    }

    pub fn clear_history(&self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY)
    }
}
