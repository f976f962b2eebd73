pub mod cpu;
pub mod disk;
pub mod threshold;

pub use cpu::CpuTotalRule;
pub use disk::DiskUsageRule;
pub use threshold::{ActiveEntry, ThresholdStateMachine, Transition};

use crate::domain::entities::alert::AlertEvent;

/// A stateful, edge-triggered rule fed with snapshots of type `S`.
///
/// Events are only returned on the transition into the alerting condition.
pub trait Rule<S>: Send + Sync {
    /// Returns the unique name of this rule
    fn name(&self) -> &'static str;

    /// Feeds one snapshot and returns the events raised by it
    fn evaluate(&self, snapshot: &S) -> Vec<AlertEvent>;
}
