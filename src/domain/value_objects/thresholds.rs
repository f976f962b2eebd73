use serde::{Deserialize, Serialize};

/// Percentages at which the rule engines raise alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Total CPU usage percentage that raises `CPU_TOTAL_HIGH`
    pub cpu_total: f64,
    /// Per-drive usage percentage that raises `DISK_USAGE_HIGH`
    pub disk_usage: f64,
}

impl ThresholdSet {
    /// Builds a threshold set, clamping both values to [0, 100].
    #[must_use]
    pub fn new(cpu_total: f64, disk_usage: f64) -> Self {
        Self {
            cpu_total: clamp_percent(cpu_total),
            disk_usage: clamp_percent(disk_usage),
        }
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            cpu_total: 80.0,
            disk_usage: 90.0,
        }
    }
}

/// Clamps a percentage to [0, 100]. NaN maps to 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
