use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::context::build_context;
use super::history::AnalysisHistory;
use super::monitor::PerformanceMonitor;
use crate::domain::entities::alert::AlertEvent;
use crate::domain::entities::analysis::AnalysisRecord;
use crate::domain::ports::analyzer::AnalysisService;
use crate::infrastructure::notifications::Topic;
use crate::{lock_or_recover, saturating_sub};

/// Dedup windows for analysis triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Minimum spacing between two triggers with the same key.
    pub cooldown: Duration,
    /// Age after which a dedup entry is forgotten.
    pub retention: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(2),
            retention: Duration::minutes(30),
        }
    }
}

/// What a batch of events did to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Nothing in the batch qualified.
    Ignored,
    /// A new analysis pass was started.
    Started,
    /// A pass was already running; one follow-up pass is now scheduled.
    Coalesced,
}

type DedupKey = (String, Option<String>);

#[derive(Default)]
struct Coordination {
    running: bool,
    pending: bool,
    last_trigger: HashMap<DedupKey, DateTime<Utc>>,
}

/// Clears the running flag if a pass loop ends without doing so itself.
struct RunningGuard<'a> {
    state: &'a Mutex<Coordination>,
    armed: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = lock_or_recover(self.state);
            state.running = false;
            state.pending = false;
        }
    }
}

/// Turns raised events into root-cause analyses.
///
/// Triggers are deduplicated per (event type, resource). At most one
/// analysis runs at a time; triggers arriving meanwhile collapse into a
/// single follow-up pass built from fresh state.
pub struct AutoAnalysisCoordinator {
    monitor: Arc<PerformanceMonitor>,
    history: Arc<AnalysisHistory>,
    service: Arc<dyn AnalysisService>,
    settings: CoordinatorSettings,
    state: Mutex<Coordination>,
    completed: Topic<AnalysisRecord>,
}

impl AutoAnalysisCoordinator {
    #[must_use]
    pub fn new(
        monitor: Arc<PerformanceMonitor>,
        history: Arc<AnalysisHistory>,
        service: Arc<dyn AnalysisService>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            monitor,
            history,
            service,
            settings,
            state: Mutex::new(Coordination::default()),
            completed: Topic::new("analysis-completed"),
        }
    }

    /// Receives every record produced by an analysis pass.
    #[must_use]
    pub fn subscribe_completed(&self) -> broadcast::Receiver<AnalysisRecord> {
        self.completed.subscribe()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.state).running
    }

    /// Number of dedup keys currently remembered.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        lock_or_recover(&self.state).last_trigger.len()
    }

    /// Consumes event batches until the channel closes.
    pub fn run(self: &Arc<Self>, mut batches: broadcast::Receiver<Vec<AlertEvent>>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match batches.recv().await {
                    Ok(batch) => {
                        let outcome = this.handle_batch(&batch);
                        tracing::debug!(?outcome, events = batch.len(), "event batch handled");
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "auto-analysis fell behind, event batches dropped");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    pub fn handle_batch(self: &Arc<Self>, events: &[AlertEvent]) -> TriggerOutcome {
        self.handle_batch_at(events, Utc::now())
    }

    /// Applies dedup and cooldown to `events` as of `now`, then starts or
    /// schedules an analysis pass when anything qualified.
    pub fn handle_batch_at(self: &Arc<Self>, events: &[AlertEvent], now: DateTime<Utc>) -> TriggerOutcome {
        {
            let mut state = lock_or_recover(&self.state);
            let retention_cutoff = saturating_sub(now, self.settings.retention);
            state.last_trigger.retain(|_, at| *at >= retention_cutoff);

            let mut accepted = false;
            for event in events.iter().filter(|e| !e.is_test()) {
                let key = (event.event_type.clone(), event.related_resource.clone());
                match state.last_trigger.get(&key) {
                    Some(last) if now - *last < self.settings.cooldown => {
                        tracing::debug!(event_type = %event.event_type, "trigger within cooldown, skipped");
                    }
                    _ => {
                        state.last_trigger.insert(key, now);
                        accepted = true;
                    }
                }
            }

            if !accepted {
                return TriggerOutcome::Ignored;
            }
            if state.running {
                state.pending = true;
                return TriggerOutcome::Coalesced;
            }
            state.running = true;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_passes().await });
        TriggerOutcome::Started
    }

    async fn run_passes(self: Arc<Self>) {
        let mut guard = RunningGuard {
            state: &self.state,
            armed: true,
        };

        loop {
            let record = self.analyze_once().await;
            tracing::info!(
                severity = %record.severity,
                succeeded = record.succeeded,
                "automatic analysis completed"
            );

            let history = Arc::clone(&self.history);
            let stored = record.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || history.append(stored)).await {
                tracing::warn!("Failed to record analysis: {e}");
            }
            self.completed.publish(record);

            let mut state = lock_or_recover(&self.state);
            if state.pending {
                state.pending = false;
                continue;
            }
            state.running = false;
            guard.armed = false;
            return;
        }
    }

    /// One call to the analysis service with a freshly built context.
    async fn analyze_once(&self) -> AnalysisRecord {
        let context = build_context(&self.monitor, &self.history, Utc::now());
        let service = Arc::clone(&self.service);
        let call = tokio::spawn(async move { service.analyze(&context).await });

        match call.await {
            Ok(Ok(text)) => AnalysisRecord::from_response(Utc::now(), &text),
            Ok(Err(e)) => {
                tracing::warn!("Automatic analysis failed: {e}");
                AnalysisRecord::failure(Utc::now(), &e.to_string())
            }
            Err(e) => {
                let reason = if e.is_panic() {
                    "analysis task panicked"
                } else {
                    "analysis task was cancelled"
                };
                tracing::warn!("{reason}");
                AnalysisRecord::failure(Utc::now(), reason)
            }
        }
    }
}
