use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::entities::alert::{AlertEvent, DISK_USAGE_HIGH};
use crate::domain::entities::disk::DriveUsage;
use crate::domain::entities::snapshot::DiskSnapshot;
use crate::lock_or_recover;

use super::threshold::{ThresholdStateMachine, Transition};
use super::Rule;

/// Edge-triggered usage rule, tracked independently per drive.
pub struct DiskUsageRule {
    state: Mutex<ThresholdStateMachine<String>>,
}

impl DiskUsageRule {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            state: Mutex::new(ThresholdStateMachine::new(threshold)),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        lock_or_recover(&self.state).threshold()
    }

    /// Replace the threshold. Every drive is treated as freshly observed
    /// afterwards: all active entries are dropped without re-evaluation.
    pub fn set_threshold(&self, threshold: f64) {
        lock_or_recover(&self.state).set_threshold(threshold);
        tracing::info!(threshold, "disk threshold changed, drive alert state cleared");
    }

    #[must_use]
    pub fn is_active(&self, drive_id: &str) -> bool {
        lock_or_recover(&self.state).is_active(&drive_id.to_owned())
    }

    /// Messages for every drive currently in alert, one per line, sorted by
    /// drive id. `None` when no drive is in alert.
    #[must_use]
    pub fn active_message(&self) -> Option<String> {
        let state = lock_or_recover(&self.state);
        let threshold = state.threshold();
        let mut lines: Vec<(String, String)> = state
            .active()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    format!(
                        "Drive {id} usage {:.1}% (threshold {threshold:.0}%)",
                        entry.last_value
                    ),
                )
            })
            .collect();
        drop(state);

        if lines.is_empty() {
            return None;
        }
        lines.sort_by(|a, b| a.0.cmp(&b.0));
        Some(
            lines
                .into_iter()
                .map(|(_, line)| line)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

impl Rule<DiskSnapshot> for DiskUsageRule {
    fn name(&self) -> &'static str {
        "disk_usage_high"
    }

    fn evaluate(&self, snapshot: &DiskSnapshot) -> Vec<AlertEvent> {
        let mut state = lock_or_recover(&self.state);
        let threshold = state.threshold();
        let mut events = Vec::new();

        for drive in &snapshot.drives {
            let transition =
                state.observe(drive.drive_id.clone(), drive.usage_percent, snapshot.timestamp);
            if transition == Transition::Raised {
                events.push(AlertEvent::new(
                    DISK_USAGE_HIGH,
                    snapshot.timestamp,
                    Some(drive.drive_id.clone()),
                    describe(drive, threshold),
                ));
            }
        }

        let present: HashSet<&str> = snapshot.drives.iter().map(|d| d.drive_id.as_str()).collect();
        let evicted = state.retain_present(|id| present.contains(id.as_str()));
        drop(state);

        if evicted > 0 {
            tracing::debug!(evicted, "dropped alert state for drives no longer present");
        }
        events
    }
}

fn describe(drive: &DriveUsage, threshold: f64) -> String {
    format!(
        "Drive {} ({}) usage {:.1}% (threshold {threshold:.0}%), {:.1} GB free of {:.1} GB",
        drive.drive_id,
        drive.label,
        drive.usage_percent,
        drive.free_gb(),
        drive.total_gb()
    )
}
