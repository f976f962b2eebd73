use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use floorwatch::application::services::auto_analysis::{
    AutoAnalysisCoordinator, CoordinatorSettings,
};
use floorwatch::application::services::history::{AnalysisHistory, HistoryLimits};
use floorwatch::application::services::monitor::{
    MonitorCollectors, MonitorSettings, PerformanceMonitor,
};
use floorwatch::domain::entities::analysis::AnalysisContext;
use floorwatch::domain::entities::disk::DriveUsage;
use floorwatch::domain::entities::snapshot::{CpuSnapshot, DiskSnapshot, MemorySnapshot};
use floorwatch::domain::ports::{
    AnalysisError, AnalysisService, CollectionError, HistoryStore, SnapshotProbe,
};
use floorwatch::domain::value_objects::sampling::IntervalBounds;
use floorwatch::infrastructure::collectors::PeriodicCollector;
use floorwatch::infrastructure::persistence::InMemoryStore;

/// CPU probe whose reported usage can be changed from the test.
pub struct DialProbe {
    usage: Arc<Mutex<f64>>,
}

impl SnapshotProbe for DialProbe {
    type Snapshot = CpuSnapshot;

    fn name(&self) -> &'static str {
        "dial"
    }

    fn capture(&mut self) -> Result<CpuSnapshot, CollectionError> {
        let usage = *self.usage.lock().expect("dial lock");
        Ok(CpuSnapshot::new(Utc::now(), usage, 4, Vec::new()))
    }

    fn fallback(&self, _: Option<&CpuSnapshot>, at: DateTime<Utc>) -> CpuSnapshot {
        CpuSnapshot::zeroed(at)
    }
}

pub struct FixedProbe<S>(pub S);

impl<S: Clone + Send + Sync + 'static> SnapshotProbe for FixedProbe<S> {
    type Snapshot = S;

    fn name(&self) -> &'static str {
        "fixed"
    }

    fn capture(&mut self) -> Result<S, CollectionError> {
        Ok(self.0.clone())
    }

    fn fallback(&self, _: Option<&S>, _: DateTime<Utc>) -> S {
        self.0.clone()
    }
}

/// Monitor whose CPU usage follows the returned dial.
pub fn dialed_monitor(initial_usage: f64) -> (Arc<PerformanceMonitor>, Arc<Mutex<f64>>) {
    let usage = Arc::new(Mutex::new(initial_usage));
    let now = Utc::now();
    let monitor = PerformanceMonitor::new(
        MonitorCollectors {
            cpu: PeriodicCollector::new(
                DialProbe {
                    usage: Arc::clone(&usage),
                },
                IntervalBounds::FAST,
            ),
            memory: PeriodicCollector::new(
                FixedProbe(MemorySnapshot::zeroed(now)),
                IntervalBounds::FAST,
            ),
            disk: PeriodicCollector::new(
                FixedProbe(DiskSnapshot::zeroed(now)),
                IntervalBounds::DISK,
            ),
        },
        MonitorSettings {
            cpu_interval: IntervalBounds::FAST.min,
            ..MonitorSettings::default()
        },
    );
    (Arc::new(monitor), usage)
}

pub fn memory_history() -> Arc<AnalysisHistory> {
    history_on(Arc::new(InMemoryStore::new()))
}

pub fn history_on(store: Arc<dyn HistoryStore>) -> Arc<AnalysisHistory> {
    Arc::new(AnalysisHistory::load(
        store,
        HistoryLimits::default(),
        Utc::now(),
    ))
}

pub fn coordinator(
    monitor: &Arc<PerformanceMonitor>,
    history: &Arc<AnalysisHistory>,
    service: Arc<dyn AnalysisService>,
) -> Arc<AutoAnalysisCoordinator> {
    Arc::new(AutoAnalysisCoordinator::new(
        Arc::clone(monitor),
        Arc::clone(history),
        service,
        CoordinatorSettings::default(),
    ))
}

/// Counts calls and holds each one until a permit is released.
pub struct GatedService {
    pub gate: Semaphore,
    pub calls: AtomicUsize,
}

impl GatedService {
    pub fn new(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(permits),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for GatedService {
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let permit = self.gate.acquire().await.expect("gate open");
        permit.forget();
        Ok(format!(
            "Warning: pass {call} saw CPU at {:.1}%",
            context.cpu_usage_percent
        ))
    }
}

pub fn drive(drive_id: &str, usage_percent: f64) -> DriveUsage {
    let total_bytes = 200 * 1_073_741_824_u64;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let used_bytes = (total_bytes as f64 * usage_percent / 100.0) as u64;
    DriveUsage {
        drive_id: drive_id.to_string(),
        label: format!("{drive_id} volume"),
        filesystem: "ext4".to_string(),
        total_bytes,
        free_bytes: total_bytes - used_bytes,
        used_bytes,
        usage_percent,
    }
}

pub fn disk_snapshot(drives: Vec<DriveUsage>) -> DiskSnapshot {
    DiskSnapshot {
        timestamp: Utc::now(),
        drives,
    }
}

/// Waits up to `limit` for `condition` to hold.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
