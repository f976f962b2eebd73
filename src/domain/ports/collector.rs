use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("failed to collect system metrics: {0}")]
    MetricsUnavailable(String),
    #[error("counter initialization failed: {0}")]
    CounterUnavailable(String),
    #[error("item {0} vanished during enumeration")]
    ItemVanished(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// One blocking sampling pass that turns OS state into an immutable snapshot.
///
/// Probes run on the blocking thread pool and may keep translation state
/// between passes (e.g. last-seen CPU time per process).
pub trait SnapshotProbe: Send + 'static {
    type Snapshot: Clone + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Capture one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` when the whole capture failed. Failures of
    /// individual items must be skipped by the probe instead.
    fn capture(&mut self) -> Result<Self::Snapshot, CollectionError>;

    /// Snapshot published when `capture` fails: the previous values re-stamped
    /// at `at`, or zeros when nothing was captured yet.
    fn fallback(&self, previous: Option<&Self::Snapshot>, at: DateTime<Utc>) -> Self::Snapshot;
}

/// Raw per-process counters read from the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// CPU time accumulated since the process started.
    pub cpu_time: Duration,
    pub memory_bytes: u64,
}

/// Enumerates running processes. Each item may fail independently.
pub trait ProcessSource: Send + 'static {
    /// Number of logical cores used to normalize per-process CPU time.
    fn core_count(&self) -> usize;

    /// List the running processes.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` when the enumeration itself is unavailable.
    fn processes(&mut self) -> Result<Vec<Result<ProcessSample, CollectionError>>, CollectionError>;
}

/// Host-wide processor utilization counter.
pub trait CpuCounter: Send + 'static {
    /// Prepare the counter. A failure here is permanent for the counter.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::CounterUnavailable` if the counter cannot be used.
    fn init(&mut self) -> Result<(), CollectionError>;

    /// Current total usage in percent.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` when this read failed; the next read is retried.
    fn read(&mut self) -> Result<f64, CollectionError>;
}
