use std::fmt::Write;
use std::sync::Mutex;

use crate::domain::entities::alert::{AlertEvent, CPU_TOTAL_HIGH};
use crate::domain::entities::snapshot::CpuSnapshot;
use crate::lock_or_recover;

use super::threshold::{ThresholdStateMachine, Transition};
use super::Rule;

/// Number of processes listed in CPU alert descriptions.
const TOP_N: usize = 5;

/// Edge-triggered rule on total CPU usage.
pub struct CpuTotalRule {
    state: Mutex<ThresholdStateMachine<()>>,
}

impl CpuTotalRule {
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

    /// Whether the rule is currently in the alerting state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock_or_recover(&self.state).is_active(&())
    }

    /// Banner text for `snapshot` if it is at/above the threshold.
    ///
    /// Pure query: rule state is not touched.
    #[must_use]
    pub fn alert_message(&self, snapshot: &CpuSnapshot) -> Option<String> {
        let threshold = self.threshold();
        (snapshot.total_usage_percent >= threshold).then(|| describe(snapshot, threshold))
    }
}

impl Rule<CpuSnapshot> for CpuTotalRule {
    fn name(&self) -> &'static str {
        "cpu_total_high"
    }

    fn evaluate(&self, snapshot: &CpuSnapshot) -> Vec<AlertEvent> {
        let mut state = lock_or_recover(&self.state);
        let transition = state.observe((), snapshot.total_usage_percent, snapshot.timestamp);
        let threshold = state.threshold();
        drop(state);

        match transition {
            Transition::Raised => {
                tracing::info!(
                    usage = snapshot.total_usage_percent,
                    threshold,
                    "CPU usage crossed threshold"
                );
                vec![AlertEvent::new(
                    CPU_TOTAL_HIGH,
                    snapshot.timestamp,
                    None,
                    describe(snapshot, threshold),
                )]
            }
            Transition::Cleared => {
                tracing::info!(usage = snapshot.total_usage_percent, "CPU usage back below threshold");
                vec![]
            }
            Transition::Held | Transition::Idle => vec![],
        }
    }
}

fn describe(snapshot: &CpuSnapshot, threshold: f64) -> String {
    let mut text = format!(
        "Total CPU usage {:.1}% (threshold {threshold:.0}%)",
        snapshot.total_usage_percent
    );
    if !snapshot.top_processes.is_empty() {
        text.push_str("; top consumers:");
        for p in snapshot.top_processes.iter().take(TOP_N) {
            let _ = write!(text, " {} (pid {}) {:.1}%,", p.name, p.pid, p.cpu_percent);
        }
        text.pop();
    }
    text
}
