use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::domain::entities::process::{rank_top, ProcessUsage};
use crate::domain::entities::snapshot::CpuSnapshot;
use crate::domain::ports::collector::{CollectionError, CpuCounter, ProcessSource, SnapshotProbe};
use crate::domain::value_objects::thresholds::clamp_percent;

/// Processes kept in each snapshot's ranking.
pub const TOP_PROCESSES: usize = 10;

/// Samples total CPU usage and derives per-process usage from CPU-time deltas.
///
/// A process's share is `Δcpu_time / (elapsed × cores)` between two passes,
/// so the first pass that sees a process reports it at 0%. State for
/// processes that disappear is pruned on every pass.
pub struct CpuProbe {
    counter: Option<Box<dyn CpuCounter>>,
    processes: Box<dyn ProcessSource>,
    last_cpu_time: HashMap<u32, Duration>,
    last_pass: Option<Instant>,
}

impl CpuProbe {
    /// Initializes `counter`. If that fails the probe permanently falls back
    /// to the clamped sum of per-process usage for the total.
    #[must_use]
    pub fn new(mut counter: Box<dyn CpuCounter>, processes: Box<dyn ProcessSource>) -> Self {
        let counter = match counter.init() {
            Ok(()) => Some(counter),
            Err(e) => {
                tracing::warn!("total CPU counter unavailable, summing per-process usage instead: {e}");
                None
            }
        };
        Self {
            counter,
            processes,
            last_cpu_time: HashMap::new(),
            last_pass: None,
        }
    }

    #[must_use]
    pub const fn has_counter(&self) -> bool {
        self.counter.is_some()
    }

    /// Number of processes with remembered CPU time.
    #[must_use]
    pub fn tracked_processes(&self) -> usize {
        self.last_cpu_time.len()
    }

    /// One sampling pass with explicit clocks.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` when process enumeration is unavailable.
    pub fn capture_at(
        &mut self,
        now: Instant,
        timestamp: DateTime<Utc>,
    ) -> Result<CpuSnapshot, CollectionError> {
        let cores = self.processes.core_count().max(1);
        let usage = self.process_usage(now, cores)?;

        let total = match self.counter.as_mut().map(|c| c.read()) {
            Some(Ok(total)) => total,
            Some(Err(e)) => {
                tracing::debug!("CPU counter read failed, using per-process sum for this pass: {e}");
                per_process_total(&usage)
            }
            None => per_process_total(&usage),
        };

        let top = rank_top(usage, TOP_PROCESSES, |p| p.cpu_percent);
        Ok(CpuSnapshot::new(timestamp, total, cores, top))
    }

    fn process_usage(&mut self, now: Instant, cores: usize) -> Result<Vec<ProcessUsage>, CollectionError> {
        let samples = self.processes.processes()?;
        let elapsed = self.last_pass.map(|previous| now.saturating_duration_since(previous));

        let mut seen = HashSet::with_capacity(samples.len());
        let mut usage = Vec::with_capacity(samples.len());
        for sample in samples {
            let sample = match sample {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::trace!("skipping process: {e}");
                    continue;
                }
            };
            seen.insert(sample.pid);
            let previous = self.last_cpu_time.insert(sample.pid, sample.cpu_time);
            let cpu_percent = match (previous, elapsed) {
                (Some(previous), Some(elapsed)) => {
                    share_of_capacity(sample.cpu_time.saturating_sub(previous), elapsed, cores)
                }
                _ => 0.0,
            };
            usage.push(ProcessUsage {
                pid: sample.pid,
                name: sample.name,
                cpu_percent,
                memory_bytes: sample.memory_bytes,
            });
        }

        self.last_cpu_time.retain(|pid, _| seen.contains(pid));
        self.last_pass = Some(now);
        Ok(usage)
    }
}

impl SnapshotProbe for CpuProbe {
    type Snapshot = CpuSnapshot;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn capture(&mut self) -> Result<CpuSnapshot, CollectionError> {
        self.capture_at(Instant::now(), Utc::now())
    }

    fn fallback(&self, previous: Option<&CpuSnapshot>, at: DateTime<Utc>) -> CpuSnapshot {
        previous.map_or_else(|| CpuSnapshot::zeroed(at), |p| p.restamped(at))
    }
}

/// `cpu_delta` as a percentage of the capacity of `cores` over `elapsed`.
#[allow(clippy::cast_precision_loss)]
fn share_of_capacity(cpu_delta: Duration, elapsed: Duration, cores: usize) -> f64 {
    let capacity = elapsed.as_secs_f64() * cores as f64;
    if capacity > 0.0 {
        clamp_percent(cpu_delta.as_secs_f64() / capacity * 100.0)
    } else {
        0.0
    }
}

fn per_process_total(usage: &[ProcessUsage]) -> f64 {
    clamp_percent(usage.iter().map(|p| p.cpu_percent).sum())
}
