use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::trend::{CpuTrendAnalyzer, TimeWindow};
use crate::domain::entities::alert::{AlertEvent, CPU_TOTAL_HIGH_TEST};
use crate::domain::entities::snapshot::{CpuSnapshot, DiskSnapshot, MemorySnapshot};
use crate::domain::entities::trend::TrendSnapshot;
use crate::domain::rules::{CpuTotalRule, DiskUsageRule, Rule};
use crate::domain::value_objects::sampling::IntervalBounds;
use crate::domain::value_objects::thresholds::{clamp_percent, ThresholdSet};
use crate::infrastructure::collectors::PeriodicCollector;
use crate::infrastructure::notifications::Topic;
use crate::{lock_or_recover, saturating_add};

/// Usage forced onto the synthetic snapshot behind a test alert.
const TEST_ALERT_USAGE: f64 = 99.0;
/// Marker prefixed to test alert banners.
pub const TEST_MARKER: &str = "[TEST]";

/// Sampling cadence and alert thresholds for one monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub cpu_interval: Duration,
    pub memory_interval: Duration,
    pub disk_interval: Duration,
    pub thresholds: ThresholdSet,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cpu_interval: IntervalBounds::FAST.default,
            memory_interval: IntervalBounds::FAST.default,
            disk_interval: IntervalBounds::DISK.default,
            thresholds: ThresholdSet::default(),
        }
    }
}

/// The three snapshot streams a monitor merges.
pub struct MonitorCollectors {
    pub cpu: PeriodicCollector<CpuSnapshot>,
    pub memory: PeriodicCollector<MemorySnapshot>,
    pub disk: PeriodicCollector<DiskSnapshot>,
}

#[derive(Debug, Clone)]
struct AlertOverride {
    message: String,
    expires_at: DateTime<Utc>,
}

struct LiveView {
    moving_average: TimeWindow,
    live_cpu_alert: Option<String>,
    test_override: Option<AlertOverride>,
    disk_alert: Option<String>,
    events: Vec<AlertEvent>,
    cpu: Option<CpuSnapshot>,
    memory: Option<MemorySnapshot>,
    disk: Option<DiskSnapshot>,
}

/// Merges the CPU, memory and disk streams into one live view, runs the
/// rules over them and republishes newly raised events as batches.
pub struct PerformanceMonitor {
    collectors: MonitorCollectors,
    settings: MonitorSettings,
    cpu_rule: CpuTotalRule,
    disk_rule: DiskUsageRule,
    trend: CpuTrendAnalyzer,
    view: Mutex<LiveView>,
    batches: Topic<Vec<AlertEvent>>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new(collectors: MonitorCollectors, settings: MonitorSettings) -> Self {
        Self {
            collectors,
            settings,
            cpu_rule: CpuTotalRule::new(settings.thresholds.cpu_total),
            disk_rule: DiskUsageRule::new(settings.thresholds.disk_usage),
            trend: CpuTrendAnalyzer::new(),
            view: Mutex::new(LiveView {
                moving_average: TimeWindow::new(chrono::Duration::minutes(5)),
                live_cpu_alert: None,
                test_override: None,
                disk_alert: None,
                events: Vec::new(),
                cpu: None,
                memory: None,
                disk: None,
            }),
            batches: Topic::new("alert-events"),
            forwarders: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    #[must_use]
    pub const fn collectors(&self) -> &MonitorCollectors {
        &self.collectors
    }

    /// Receives every batch of newly raised events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Vec<AlertEvent>> {
        self.batches.subscribe()
    }

    /// Starts all collectors and the forwarding of their snapshots.
    ///
    /// Calling it again while running only re-applies the intervals.
    pub fn start(self: &Arc<Self>) {
        self.collectors.cpu.start(self.settings.cpu_interval);
        self.collectors.memory.start(self.settings.memory_interval);
        self.collectors.disk.start(self.settings.disk_interval);

        let mut forwarders = lock_or_recover(&self.forwarders);
        if !forwarders.is_empty() {
            return;
        }
        forwarders.push(forward(
            self.collectors.cpu.subscribe(),
            Arc::downgrade(self),
            |monitor, snapshot| {
                monitor.on_cpu_snapshot(snapshot);
            },
        ));
        forwarders.push(forward(
            self.collectors.memory.subscribe(),
            Arc::downgrade(self),
            |monitor, snapshot| monitor.on_memory_snapshot(snapshot),
        ));
        forwarders.push(forward(
            self.collectors.disk.subscribe(),
            Arc::downgrade(self),
            |monitor, snapshot| {
                monitor.on_disk_snapshot(snapshot);
            },
        ));
        drop(forwarders);
        tracing::info!("performance monitor started");
    }

    /// Stops all collectors. A no-op when not running.
    pub fn stop(&self) {
        let forwarders = std::mem::take(&mut *lock_or_recover(&self.forwarders));
        let was_running = !forwarders.is_empty();
        for handle in forwarders {
            handle.abort();
        }
        self.collectors.cpu.stop();
        self.collectors.memory.stop();
        self.collectors.disk.stop();
        if was_running {
            tracing::info!("performance monitor stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !lock_or_recover(&self.forwarders).is_empty()
    }

    /// Captures every stream once, outside the schedules.
    ///
    /// When the monitor is running the forwarders apply the new snapshots;
    /// otherwise they are applied here.
    pub async fn refresh(&self) {
        let running = self.is_running();
        if let Some(snapshot) = self.collectors.cpu.capture_now().await {
            if !running {
                self.on_cpu_snapshot(&snapshot);
            }
        }
        if let Some(snapshot) = self.collectors.memory.capture_now().await {
            if !running {
                self.on_memory_snapshot(&snapshot);
            }
        }
        if let Some(snapshot) = self.collectors.disk.capture_now().await {
            if !running {
                self.on_disk_snapshot(&snapshot);
            }
        }
    }

    /// Applies one CPU snapshot and returns the events it raised.
    pub fn on_cpu_snapshot(&self, snapshot: &CpuSnapshot) -> Vec<AlertEvent> {
        let events = self.cpu_rule.evaluate(snapshot);
        let live_alert = self.cpu_rule.alert_message(snapshot);
        self.trend
            .update(snapshot.total_usage_percent, snapshot.timestamp);

        {
            let mut view = lock_or_recover(&self.view);
            view.moving_average
                .push(snapshot.timestamp, snapshot.total_usage_percent);
            view.live_cpu_alert = live_alert;
            view.events.extend(events.iter().cloned());
            view.cpu = Some(snapshot.clone());
        }

        self.publish(&events);
        events
    }

    pub fn on_memory_snapshot(&self, snapshot: &MemorySnapshot) {
        lock_or_recover(&self.view).memory = Some(snapshot.clone());
    }

    /// Applies one disk snapshot and returns the events it raised.
    pub fn on_disk_snapshot(&self, snapshot: &DiskSnapshot) -> Vec<AlertEvent> {
        let events = self.disk_rule.evaluate(snapshot);
        let message = self.disk_rule.active_message();

        {
            let mut view = lock_or_recover(&self.view);
            view.disk_alert = message;
            view.events.extend(events.iter().cloned());
            view.disk = Some(snapshot.clone());
        }

        self.publish(&events);
        events
    }

    fn publish(&self, events: &[AlertEvent]) {
        if events.is_empty() {
            return;
        }
        let delivered = self.batches.publish(events.to_vec());
        tracing::debug!(events = events.len(), delivered, "published alert batch");
    }

    /// Shows a `[TEST]` CPU alert for `duration` and publishes a synthetic
    /// `CPU_TOTAL_HIGH_TEST` event. Rule state is left untouched.
    pub fn trigger_test_alert(&self, duration: Duration) -> AlertEvent {
        self.trigger_test_alert_at(duration, Utc::now())
    }

    pub fn trigger_test_alert_at(&self, duration: Duration, now: DateTime<Utc>) -> AlertEvent {
        let base = self.latest_cpu();
        let forced = base
            .as_ref()
            .map_or(0.0, |s| s.total_usage_percent)
            .max(TEST_ALERT_USAGE)
            .max(self.cpu_rule.threshold());
        let synthetic = CpuSnapshot::new(
            now,
            clamp_percent(forced),
            base.as_ref().map_or(0, |s| s.core_count),
            base.map(|s| s.top_processes).unwrap_or_default(),
        );
        let message = self.cpu_rule.alert_message(&synthetic).unwrap_or_else(|| {
            format!("Total CPU usage {:.1}%", synthetic.total_usage_percent)
        });
        let message = format!("{TEST_MARKER} {message}");

        let expires_at = chrono::Duration::from_std(duration)
            .map_or(DateTime::<Utc>::MAX_UTC, |d| saturating_add(now, d));
        let event = AlertEvent::new(CPU_TOTAL_HIGH_TEST, now, None, message.clone());
        {
            let mut view = lock_or_recover(&self.view);
            view.test_override = Some(AlertOverride {
                message,
                expires_at,
            });
            view.events.push(event.clone());
        }

        tracing::info!(?duration, "test alert triggered");
        self.publish(std::slice::from_ref(&event));
        event
    }

    /// Current CPU alert banner, if any.
    #[must_use]
    pub fn cpu_alert(&self) -> Option<String> {
        self.cpu_alert_at(Utc::now())
    }

    /// An unexpired test override wins over the live rule result.
    #[must_use]
    pub fn cpu_alert_at(&self, now: DateTime<Utc>) -> Option<String> {
        let view = lock_or_recover(&self.view);
        view.test_override
            .as_ref()
            .filter(|o| now < o.expires_at)
            .map(|o| o.message.clone())
            .or_else(|| view.live_cpu_alert.clone())
    }

    #[must_use]
    pub fn is_cpu_alert_active(&self) -> bool {
        self.cpu_alert().is_some()
    }

    #[must_use]
    pub fn disk_alert(&self) -> Option<String> {
        lock_or_recover(&self.view).disk_alert.clone()
    }

    /// Mean CPU usage over the last five minutes of samples.
    #[must_use]
    pub fn five_minute_average(&self) -> f64 {
        self.five_minute_average_at(Utc::now())
    }

    /// Samples older than five minutes before `now` are dropped first, so a
    /// stalled CPU stream decays to 0 instead of repeating stale readings.
    #[must_use]
    pub fn five_minute_average_at(&self, now: DateTime<Utc>) -> f64 {
        let mut view = lock_or_recover(&self.view);
        view.moving_average.trim(now);
        view.moving_average.average()
    }

    #[must_use]
    pub fn trend(&self) -> TrendSnapshot {
        self.trend.snapshot(Utc::now())
    }

    #[must_use]
    pub fn trend_at(&self, now: DateTime<Utc>) -> TrendSnapshot {
        self.trend.snapshot(now)
    }

    /// Every event raised so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AlertEvent> {
        lock_or_recover(&self.view).events.clone()
    }

    /// The `n` most recent events, oldest first.
    #[must_use]
    pub fn recent_events(&self, n: usize) -> Vec<AlertEvent> {
        let view = lock_or_recover(&self.view);
        let skip = view.events.len().saturating_sub(n);
        view.events[skip..].to_vec()
    }

    #[must_use]
    pub fn latest_cpu(&self) -> Option<CpuSnapshot> {
        lock_or_recover(&self.view).cpu.clone()
    }

    #[must_use]
    pub fn latest_memory(&self) -> Option<MemorySnapshot> {
        lock_or_recover(&self.view).memory.clone()
    }

    #[must_use]
    pub fn latest_disk(&self) -> Option<DiskSnapshot> {
        lock_or_recover(&self.view).disk.clone()
    }

    #[must_use]
    pub fn disk_threshold(&self) -> f64 {
        self.disk_rule.threshold()
    }

    /// Applies a new disk threshold; every drive is then treated as freshly
    /// observed. Unchanged values are ignored.
    pub fn set_disk_threshold(&self, percent: f64) {
        let percent = clamp_percent(percent);
        if (percent - self.disk_rule.threshold()).abs() < f64::EPSILON {
            return;
        }
        self.disk_rule.set_threshold(percent);
        let message = self.disk_rule.active_message();
        lock_or_recover(&self.view).disk_alert = message;
    }

    /// Follows a configuration channel carrying the disk threshold, applying
    /// the current value immediately and every change afterwards.
    pub fn watch_disk_threshold(self: &Arc<Self>, mut threshold: watch::Receiver<f64>) -> JoinHandle<()> {
        let monitor = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let value = *threshold.borrow_and_update();
                match monitor.upgrade() {
                    Some(monitor) => monitor.set_disk_threshold(value),
                    None => return,
                }
                if threshold.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

/// Applies every snapshot published on `rx` to the monitor until either side
/// goes away.
fn forward<S, F>(
    mut rx: watch::Receiver<Option<Arc<S>>>,
    monitor: Weak<PerformanceMonitor>,
    apply: F,
) -> JoinHandle<()>
where
    S: Send + Sync + 'static,
    F: Fn(&PerformanceMonitor, &S) + Send + 'static,
{
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(snapshot) = rx.borrow_and_update().clone() else {
                continue;
            };
            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            apply(&monitor, &snapshot);
        }
    })
}
