pub mod sampling;
pub mod severity;
pub mod thresholds;

pub use sampling::IntervalBounds;
pub use severity::Severity;
pub use thresholds::{clamp_percent, ThresholdSet};
