use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::analysis::AnalysisRecord;
use crate::domain::ports::store::HistoryStore;
use crate::{lock_or_recover, saturating_sub};

/// How much analysis history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub retention: Duration,
    pub max_records: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            retention: Duration::days(7),
            max_records: 200,
        }
    }
}

/// Drops records older than the retention window, then the oldest entries
/// beyond the count cap. `records` must already be newest-first.
pub fn trim_records(records: &mut Vec<AnalysisRecord>, limits: HistoryLimits, now: DateTime<Utc>) {
    let cutoff = saturating_sub(now, limits.retention);
    records.retain(|r| r.timestamp >= cutoff);
    records.truncate(limits.max_records);
}

#[derive(Default)]
struct SaveState {
    saving: bool,
    dirty: bool,
}

/// Bounded, newest-first log of analysis records.
///
/// Loaded once, then kept in memory; the in-memory list stays authoritative
/// when the backing store fails.
pub struct AnalysisHistory {
    store: Arc<dyn HistoryStore>,
    limits: HistoryLimits,
    records: Mutex<Vec<AnalysisRecord>>,
    /// One writer at a time; appends made during a save set `dirty` and the
    /// writer saves again with the newest list.
    save: Mutex<SaveState>,
}

impl AnalysisHistory {
    /// Loads and trims the persisted records. A failed load starts empty.
    #[must_use]
    pub fn load(store: Arc<dyn HistoryStore>, limits: HistoryLimits, now: DateTime<Utc>) -> Self {
        let mut records = store.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load analysis history, starting empty: {e}");
            Vec::new()
        });
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let loaded = records.len();
        trim_records(&mut records, limits, now);
        if records.len() < loaded {
            tracing::debug!(
                dropped = loaded - records.len(),
                "trimmed analysis history on load"
            );
        }

        Self {
            store,
            limits,
            records: Mutex::new(records),
            save: Mutex::new(SaveState::default()),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Prepends `record`, trims, and persists the result.
    pub fn append(&self, record: AnalysisRecord) {
        self.append_at(record, Utc::now());
    }

    pub fn append_at(&self, record: AnalysisRecord, now: DateTime<Utc>) {
        {
            let mut records = lock_or_recover(&self.records);
            records.insert(0, record);
            trim_records(&mut records, self.limits, now);
        }
        self.persist();
    }

    /// Saves the current list without holding any lock across the store
    /// call. A concurrent caller only flags the list as dirty.
    fn persist(&self) {
        {
            let mut save = lock_or_recover(&self.save);
            if save.saving {
                save.dirty = true;
                tracing::debug!("history save in flight, deferring to it");
                return;
            }
            save.saving = true;
        }

        loop {
            let records = self.records();
            if let Err(e) = self.store.save(&records) {
                tracing::warn!("Failed to save analysis history: {e}");
            }

            let mut save = lock_or_recover(&self.save);
            if save.dirty {
                save.dirty = false;
            } else {
                save.saving = false;
                return;
            }
        }
    }

    /// All records, newest first.
    #[must_use]
    pub fn records(&self) -> Vec<AnalysisRecord> {
        lock_or_recover(&self.records).clone()
    }

    #[must_use]
    pub fn latest(&self) -> Option<AnalysisRecord> {
        lock_or_recover(&self.records).first().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.records).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryStore;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-10T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn make_record(at: DateTime<Utc>, text: &str) -> AnalysisRecord {
        AnalysisRecord::from_response(at, text)
    }

    #[test]
    fn load_drops_expired_and_sorts_newest_first() {
        let now = now();
        let store = Arc::new(InMemoryStore::with_records(vec![
            make_record(now - Duration::days(8), "expired"),
            make_record(now - Duration::hours(2), "older"),
            make_record(now - Duration::minutes(5), "newer"),
        ]));
        let history = AnalysisHistory::load(store, HistoryLimits::default(), now);

        let texts: Vec<String> = history.records().into_iter().map(|r| r.full_text).collect();
        assert_eq!(texts, vec!["newer", "older"]);
    }

    #[test]
    fn load_applies_count_cap() {
        let now = now();
        let records = (0..250)
            .map(|i| make_record(now - Duration::minutes(i), &format!("r{i}")))
            .collect();
        let store = Arc::new(InMemoryStore::with_records(records));
        let history = AnalysisHistory::load(store, HistoryLimits::default(), now);
        assert_eq!(history.len(), 200);
        assert_eq!(history.latest().expect("latest").full_text, "r0");
        assert_eq!(history.records().last().expect("oldest").full_text, "r199");
    }

    #[test]
    fn append_inserts_at_front_and_trims() {
        let now = now();
        let limits = HistoryLimits {
            retention: Duration::days(7),
            max_records: 3,
        };
        let store = Arc::new(InMemoryStore::new());
        let history = AnalysisHistory::load(store.clone(), limits, now);

        for i in 0..5 {
            history.append_at(make_record(now, &format!("r{i}")), now);
        }
        let texts: Vec<String> = history.records().into_iter().map(|r| r.full_text).collect();
        assert_eq!(texts, vec!["r4", "r3", "r2"]);
        assert_eq!(store.persisted().expect("persisted").len(), 3);
        assert_eq!(store.save_count(), 5);
    }

    #[test]
    fn append_drops_records_past_retention() {
        let now = now();
        let store = Arc::new(InMemoryStore::with_records(vec![make_record(
            now - Duration::days(6),
            "aging",
        )]));
        let history = AnalysisHistory::load(store, HistoryLimits::default(), now);
        assert_eq!(history.len(), 1);

        let later = now + Duration::days(2);
        history.append_at(make_record(later, "fresh"), later);
        let texts: Vec<String> = history.records().into_iter().map(|r| r.full_text).collect();
        assert_eq!(texts, vec!["fresh"]);
    }

    #[test]
    fn save_failure_keeps_memory_authoritative() {
        let now = now();
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_saves(true);
        let history = AnalysisHistory::load(store.clone(), HistoryLimits::default(), now);

        history.append_at(make_record(now, "kept in memory"), now);
        assert_eq!(history.len(), 1);
        assert!(store.persisted().expect("persisted").is_empty());

        store.set_fail_saves(false);
        history.append_at(make_record(now, "second"), now);
        assert_eq!(store.persisted().expect("persisted").len(), 2);
    }

    #[test]
    fn append_during_save_is_saved_by_the_running_writer() {
        use std::sync::{OnceLock, Weak};

        use crate::domain::ports::store::StoreError;

        #[derive(Default)]
        struct EchoStore {
            history: OnceLock<Weak<AnalysisHistory>>,
            saves: Mutex<Vec<Vec<AnalysisRecord>>>,
        }
        impl HistoryStore for EchoStore {
            fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
                Ok(Vec::new())
            }
            fn save(&self, records: &[AnalysisRecord]) -> Result<(), StoreError> {
                let first = {
                    let mut saves = self.saves.lock().expect("saves lock");
                    saves.push(records.to_vec());
                    saves.len() == 1
                };
                if first {
                    if let Some(history) = self.history.get().and_then(Weak::upgrade) {
                        history.append_at(make_record(now(), "written during save"), now());
                    }
                }
                Ok(())
            }
        }

        let store = Arc::new(EchoStore::default());
        let history = Arc::new(AnalysisHistory::load(
            Arc::clone(&store) as _,
            HistoryLimits::default(),
            now(),
        ));
        let _ = store.history.set(Arc::downgrade(&history));

        history.append_at(make_record(now(), "first"), now());

        let saves = store.saves.lock().expect("saves lock");
        assert_eq!(saves.len(), 2);
        let texts: Vec<&str> = saves[1].iter().map(|r| r.full_text.as_str()).collect();
        assert_eq!(texts, vec!["written during save", "first"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn unbounded_retention_keeps_old_records() {
        let now = now();
        let store = Arc::new(InMemoryStore::with_records(vec![make_record(
            now - Duration::days(3000),
            "ancient",
        )]));
        let limits = HistoryLimits {
            retention: Duration::days(i64::from(u32::MAX)),
            max_records: 200,
        };
        let history = AnalysisHistory::load(store, limits, now);
        assert_eq!(history.len(), 1);

        history.append_at(make_record(now, "fresh"), now);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn failed_load_starts_empty() {
        struct BrokenStore;
        impl HistoryStore for BrokenStore {
            fn load(&self) -> Result<Vec<AnalysisRecord>, crate::domain::ports::store::StoreError> {
                Err(crate::domain::ports::store::StoreError::ReadFailed("corrupt".into()))
            }
            fn save(&self, _: &[AnalysisRecord]) -> Result<(), crate::domain::ports::store::StoreError> {
                Ok(())
            }
        }
        let history = AnalysisHistory::load(Arc::new(BrokenStore), HistoryLimits::default(), now());
        assert!(history.is_empty());
    }
}
