pub mod analyzer;
pub mod collector;
pub mod store;

pub use analyzer::{AnalysisError, AnalysisService};
pub use collector::{
    CollectionError, CpuCounter, ProcessSample, ProcessSource, SnapshotProbe,
};
pub use store::{HistoryStore, StoreError};
