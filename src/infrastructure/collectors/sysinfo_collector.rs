use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::domain::entities::process::{rank_top, ProcessUsage};
use crate::domain::entities::snapshot::{safe_percent, MemorySnapshot};
use crate::domain::ports::collector::{
    CollectionError, CpuCounter, ProcessSample, ProcessSource, SnapshotProbe,
};

/// Processes kept in each memory snapshot's ranking.
const TOP_MEMORY_PROCESSES: usize = 10;

/// Host-wide CPU usage read from `sysinfo`.
pub struct SysinfoCpuCounter {
    sys: System,
}

impl SysinfoCpuCounter {
    #[must_use]
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysinfoCpuCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuCounter for SysinfoCpuCounter {
    fn init(&mut self) -> Result<(), CollectionError> {
        // The first refresh only primes the usage baseline.
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Err(CollectionError::CounterUnavailable(
                "no processors reported".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&mut self) -> Result<f64, CollectionError> {
        self.sys.refresh_cpu_usage();
        let usage = self.sys.global_cpu_usage();
        if usage.is_finite() {
            Ok(f64::from(usage))
        } else {
            Err(CollectionError::MetricsUnavailable(
                "global CPU usage is not a number".to_string(),
            ))
        }
    }
}

/// Running processes with their accumulated CPU time, read from `sysinfo`.
pub struct SysinfoProcessSource {
    sys: System,
    cores: usize,
}

impl SysinfoProcessSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            cores: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

impl Default for SysinfoProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoProcessSource {
    fn core_count(&self) -> usize {
        self.cores
    }

    fn processes(&mut self) -> Result<Vec<Result<ProcessSample, CollectionError>>, CollectionError> {
        refresh_processes(&mut self.sys)?;
        Ok(self
            .sys
            .processes()
            .values()
            .map(|process| {
                let pid = process.pid().as_u32();
                let name = process.name().to_string_lossy().into_owned();
                if name.is_empty() {
                    return Err(CollectionError::ItemVanished(format!("pid {pid}")));
                }
                Ok(ProcessSample {
                    pid,
                    name,
                    cpu_time: Duration::from_millis(process.accumulated_cpu_time()),
                    memory_bytes: process.memory(),
                })
            })
            .collect())
    }
}

/// Physical memory usage and the largest resident processes.
pub struct MemoryProbe {
    sys: System,
}

impl MemoryProbe {
    #[must_use]
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotProbe for MemoryProbe {
    type Snapshot = MemorySnapshot;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn capture(&mut self) -> Result<MemorySnapshot, CollectionError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(CollectionError::MetricsUnavailable(
                "total memory reported as zero".to_string(),
            ));
        }

        // The ranking is best effort; totals are still worth publishing.
        let top_processes = match refresh_processes(&mut self.sys) {
            Ok(()) => rank_by_memory(&self.sys),
            Err(e) => {
                tracing::debug!("memory ranking unavailable: {e}");
                Vec::new()
            }
        };

        let used = self.sys.used_memory();
        Ok(MemorySnapshot {
            timestamp: Utc::now(),
            total_bytes: total,
            used_bytes: used,
            available_bytes: self.sys.available_memory(),
            usage_percent: safe_percent(used, total),
            top_processes,
        })
    }

    fn fallback(&self, previous: Option<&MemorySnapshot>, at: DateTime<Utc>) -> MemorySnapshot {
        previous.map_or_else(|| MemorySnapshot::zeroed(at), |p| p.restamped(at))
    }
}

fn refresh_processes(sys: &mut System) -> Result<(), CollectionError> {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cpu().with_memory(),
    );
    if sys.processes().is_empty() {
        return Err(CollectionError::MetricsUnavailable(
            "process list is empty".to_string(),
        ));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn rank_by_memory(sys: &System) -> Vec<ProcessUsage> {
    let all = sys
        .processes()
        .values()
        .map(|process| ProcessUsage {
            pid: process.pid().as_u32(),
            name: process.name().to_string_lossy().into_owned(),
            cpu_percent: 0.0,
            memory_bytes: process.memory(),
        })
        .collect();
    rank_top(all, TOP_MEMORY_PROCESSES, |p| p.memory_bytes as f64)
}
