//! Periodic, single-flight driver shared by every snapshot collector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::ports::collector::SnapshotProbe;
use crate::domain::value_objects::sampling::IntervalBounds;
use crate::lock_or_recover;

type BoxedProbe<S> = Box<dyn SnapshotProbe<Snapshot = S>>;

/// Latest published snapshot; `None` until the first capture completes.
pub type Latest<S> = Option<Arc<S>>;

/// Runs a [`SnapshotProbe`] on its own schedule and publishes every result.
///
/// At most one capture is in flight at a time. Ticks and [`capture_now`]
/// calls that arrive while a capture is running are dropped, never queued,
/// so publish order always equals capture-start order.
///
/// Cloning yields another handle to the same collector.
///
/// [`capture_now`]: PeriodicCollector::capture_now
pub struct PeriodicCollector<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    name: &'static str,
    probe: Mutex<BoxedProbe<S>>,
    capturing: AtomicBool,
    latest: watch::Sender<Latest<S>>,
    bounds: IntervalBounds,
    runner: Mutex<Option<Runner>>,
}

struct Runner {
    interval: watch::Sender<Duration>,
    handle: JoinHandle<()>,
}

/// Clears the in-flight flag when the capture ends, however it ends.
struct CaptureGuard<'a>(&'a AtomicBool);

impl<'a> CaptureGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        let runner = self.runner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(runner) = runner.take() {
            runner.handle.abort();
        }
    }
}

impl<S> Clone for PeriodicCollector<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> PeriodicCollector<S> {
    #[must_use]
    pub fn new<P>(probe: P, bounds: IntervalBounds) -> Self
    where
        P: SnapshotProbe<Snapshot = S>,
    {
        let name = probe.name();
        let (latest, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                name,
                probe: Mutex::new(Box::new(probe)),
                capturing: AtomicBool::new(false),
                latest,
                bounds,
                runner: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Latest<S> {
        self.inner.latest.borrow().clone()
    }

    /// Receiver notified on every publish. Slow readers only ever see the
    /// newest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Latest<S>> {
        self.inner.latest.subscribe()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.inner.capturing.load(Ordering::Acquire)
    }

    /// Capture and publish one snapshot outside the schedule.
    ///
    /// Returns `None` without capturing when another capture is in flight.
    /// A failed capture publishes the probe's fallback snapshot instead.
    pub async fn capture_now(&self) -> Option<Arc<S>> {
        let Some(_guard) = CaptureGuard::acquire(&self.inner.capturing) else {
            tracing::debug!(collector = self.inner.name, "capture already in flight, skipping");
            return None;
        };

        let previous = self.latest();
        let inner = Arc::clone(&self.inner);
        let fallback_previous = previous.clone();
        let captured = tokio::task::spawn_blocking(move || {
            let mut probe = lock_or_recover(&inner.probe);
            match probe.capture() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(collector = inner.name, "capture failed, publishing fallback: {e}");
                    probe.fallback(fallback_previous.as_deref(), Utc::now())
                }
            }
        })
        .await;

        let snapshot = match captured {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(collector = self.inner.name, "capture task aborted: {e}");
                lock_or_recover(&self.inner.probe).fallback(previous.as_deref(), Utc::now())
            }
        };

        let snapshot = Arc::new(snapshot);
        self.inner.latest.send_replace(Some(Arc::clone(&snapshot)));
        Some(snapshot)
    }

    /// Start the schedule, or change its interval if already running.
    ///
    /// The interval is clamped to the collector's bounds; the effective value
    /// is returned. Must be called from within a Tokio runtime.
    pub fn start(&self, requested: Duration) -> Duration {
        let interval = self.inner.bounds.clamp(requested);
        let mut runner = lock_or_recover(&self.inner.runner);

        if let Some(existing) = runner.as_ref().filter(|r| !r.handle.is_finished()) {
            existing.interval.send_replace(interval);
            tracing::info!(collector = self.inner.name, ?interval, "collector interval reconfigured");
            return interval;
        }

        let (interval_tx, interval_rx) = watch::channel(interval);
        let handle = tokio::spawn(Self::run(Arc::downgrade(&self.inner), interval_rx));
        *runner = Some(Runner {
            interval: interval_tx,
            handle,
        });
        drop(runner);

        tracing::info!(collector = self.inner.name, ?interval, "collector started");
        interval
    }

    /// Stop the schedule. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let Some(runner) = lock_or_recover(&self.inner.runner).take() else {
            return false;
        };
        runner.handle.abort();
        tracing::info!(collector = self.inner.name, "collector stopped");
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.inner.runner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Holds only a weak handle between ticks, so dropping the last
    /// collector handle ends the schedule.
    async fn run(inner: Weak<Inner<S>>, mut interval_rx: watch::Receiver<Duration>) {
        loop {
            let period = *interval_rx.borrow_and_update();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(strong) = inner.upgrade() else {
                            return;
                        };
                        let this = Self { inner: strong };
                        // Detached so a slow capture never delays the ticker;
                        // overlapping ticks are rejected by the capture guard.
                        tokio::spawn(async move {
                            this.capture_now().await;
                        });
                    }
                    changed = interval_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    }
}
