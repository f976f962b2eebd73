use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::disk::DriveUsage;
use super::process::ProcessUsage;
use crate::domain::value_objects::thresholds::clamp_percent;

/// Processor usage at the end of one sampling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_usage_percent: f64,
    pub core_count: usize,
    /// Highest CPU consumers first.
    pub top_processes: Vec<ProcessUsage>,
}

impl CpuSnapshot {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        total_usage_percent: f64,
        core_count: usize,
        top_processes: Vec<ProcessUsage>,
    ) -> Self {
        Self {
            timestamp,
            total_usage_percent: clamp_percent(total_usage_percent),
            core_count,
            top_processes,
        }
    }

    #[must_use]
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, 0.0, 0, Vec::new())
    }

    /// Copy of this snapshot carrying a new timestamp.
    #[must_use]
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

/// Physical memory usage at the end of one sampling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub usage_percent: f64,
    /// Largest resident sets first.
    pub top_processes: Vec<ProcessUsage>,
}

impl MemorySnapshot {
    #[must_use]
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            total_bytes: 0,
            used_bytes: 0,
            available_bytes: 0,
            usage_percent: 0.0,
            top_processes: Vec::new(),
        }
    }

    #[must_use]
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

/// Fixed-drive capacity at the end of one sampling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub timestamp: DateTime<Utc>,
    pub drives: Vec<DriveUsage>,
}

impl DiskSnapshot {
    #[must_use]
    pub const fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            drives: Vec::new(),
        }
    }

    #[must_use]
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

/// Returns `(numerator / denominator) * 100.0` clamped to [0, 100], or `0.0`
/// when `denominator` is zero.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn safe_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        clamp_percent((numerator as f64 / denominator as f64) * 100.0)
    } else {
        0.0
    }
}
