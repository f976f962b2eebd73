use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type raised when total CPU usage crosses its threshold.
pub const CPU_TOTAL_HIGH: &str = "CPU_TOTAL_HIGH";
/// Event type raised when a drive crosses its usage threshold.
pub const DISK_USAGE_HIGH: &str = "DISK_USAGE_HIGH";
/// Synthetic event type produced by a manual test alert.
pub const CPU_TOTAL_HIGH_TEST: &str = "CPU_TOTAL_HIGH_TEST";

/// A threshold crossing, created once at the instant the condition starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_type: String,
    pub start_time: DateTime<Utc>,
    /// Process name or drive id the event refers to, if any.
    pub related_resource: Option<String>,
    pub description: String,
}

impl AlertEvent {
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        start_time: DateTime<Utc>,
        related_resource: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            start_time,
            related_resource,
            description: description.into(),
        }
    }

    /// Synthetic events only exercise the pipeline and never feed analysis.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.event_type.contains("TEST")
    }
}
