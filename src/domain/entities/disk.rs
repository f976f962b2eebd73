use serde::{Deserialize, Serialize};

/// Capacity of one fixed drive (mount point or drive letter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveUsage {
    /// Stable identifier used as the alert key, e.g. `C:` or `/data`.
    pub drive_id: String,
    pub label: String,
    pub filesystem: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

const BYTES_PER_GB: f64 = 1_073_741_824.0;

impl DriveUsage {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn free_gb(&self) -> f64 {
        self.free_bytes as f64 / BYTES_PER_GB
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn total_gb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_GB
    }
}
