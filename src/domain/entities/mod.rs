pub mod alert;
pub mod analysis;
pub mod disk;
pub mod process;
pub mod snapshot;
pub mod trend;

pub use alert::AlertEvent;
pub use analysis::{AnalysisContext, AnalysisRecord};
pub use disk::DriveUsage;
pub use process::ProcessUsage;
pub use snapshot::{CpuSnapshot, DiskSnapshot, MemorySnapshot};
pub use trend::{Stability, TrendSnapshot};
