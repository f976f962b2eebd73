use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::entities::analysis::AnalysisRecord;
use crate::domain::ports::store::{HistoryStore, StoreError};

/// In-memory history store, used when persistence is disabled and in tests.
///
/// Writes can be made to fail on demand to exercise error paths.
pub struct InMemoryStore {
    records: Mutex<Vec<AnalysisRecord>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// Store pre-populated with `records`, as if written by an earlier run.
    #[must_use]
    pub fn with_records(records: Vec<AnalysisRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::new()
        }
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Currently persisted records.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn persisted(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        self.load()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for InMemoryStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }

    fn save(&self, records: &[AnalysisRecord]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("simulated write failure".into()));
        }
        *self
            .records
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
