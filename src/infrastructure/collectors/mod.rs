pub mod cpu_probe;
pub mod disk_collector;
pub mod periodic;
pub mod sysinfo_collector;

pub use cpu_probe::CpuProbe;
pub use disk_collector::DiskProbe;
pub use periodic::PeriodicCollector;
pub use sysinfo_collector::{MemoryProbe, SysinfoCpuCounter, SysinfoProcessSource};
