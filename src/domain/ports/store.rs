use thiserror::Error;

use crate::domain::entities::analysis::AnalysisRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
}

/// Backing store for the analysis history log.
pub trait HistoryStore: Send + Sync {
    /// Load every persisted record. An absent store yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError>;

    /// Replace the persisted list with `records`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn save(&self, records: &[AnalysisRecord]) -> Result<(), StoreError>;
}
