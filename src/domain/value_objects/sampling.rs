use std::time::Duration;

/// Allowed range and default for one collector's sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalBounds {
    pub min: Duration,
    pub max: Duration,
    pub default: Duration,
}

impl IntervalBounds {
    /// CPU and memory collectors: 1 s by default, between 250 ms and 10 s.
    pub const FAST: Self = Self {
        min: Duration::from_millis(250),
        max: Duration::from_secs(10),
        default: Duration::from_secs(1),
    };

    /// Disk collector: 15 s by default, between 10 s and 30 s.
    pub const DISK: Self = Self {
        min: Duration::from_secs(10),
        max: Duration::from_secs(30),
        default: Duration::from_secs(15),
    };

    #[must_use]
    pub fn clamp(&self, requested: Duration) -> Duration {
        requested.clamp(self.min, self.max)
    }
}
