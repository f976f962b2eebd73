use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::application::services::monitor::PerformanceMonitor;
use crate::domain::entities::snapshot::{CpuSnapshot, DiskSnapshot, MemorySnapshot};
use crate::domain::entities::trend::TrendSnapshot;
use crate::presentation::cli::formatters::status_fmt::{
    colorize_percent, format_drive, format_process_table, format_trend, print_section_header,
    progress_bar,
};

/// Delay between the two CPU captures; per-process shares need a baseline.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Everything `status` reports, in one serializable value.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub cpu: Option<CpuSnapshot>,
    pub memory: Option<MemorySnapshot>,
    pub disk: Option<DiskSnapshot>,
    pub five_minute_average: f64,
    pub trend: TrendSnapshot,
    pub cpu_alert: Option<String>,
    pub disk_alert: Option<String>,
}

impl StatusReport {
    #[must_use]
    pub fn from_monitor(monitor: &PerformanceMonitor) -> Self {
        Self {
            cpu: monitor.latest_cpu(),
            memory: monitor.latest_memory(),
            disk: monitor.latest_disk(),
            five_minute_average: monitor.five_minute_average(),
            trend: monitor.trend(),
            cpu_alert: monitor.cpu_alert(),
            disk_alert: monitor.disk_alert(),
        }
    }
}

/// Samples every stream once (CPU twice) on a stopped monitor and prints the result.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn run_status(monitor: &PerformanceMonitor, json: bool) -> anyhow::Result<()> {
    monitor.refresh().await;
    tokio::time::sleep(SETTLE_DELAY).await;
    if let Some(snapshot) = monitor.collectors().cpu.capture_now().await {
        monitor.on_cpu_snapshot(&snapshot);
    }

    let report = StatusReport::from_monitor(monitor);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &StatusReport) {
    println!("{}", "floorwatch status".bold().cyan());
    println!("{}", "━".repeat(50));

    print_section_header("\nCPU");
    match &report.cpu {
        Some(cpu) => {
            println!(
                "  {} {} ({} cores)",
                progress_bar(cpu.total_usage_percent, 30),
                colorize_percent(cpu.total_usage_percent),
                cpu.core_count
            );
            println!("  {}", format_trend(&report.trend));
        }
        None => println!("  {}", "unavailable".dimmed()),
    }

    print_section_header("\nMemory");
    match &report.memory {
        Some(memory) => {
            println!(
                "  {} {}",
                progress_bar(memory.usage_percent, 30),
                colorize_percent(memory.usage_percent)
            );
            println!(
                "  Used: {} MB / {} MB (available: {} MB)",
                memory.used_bytes / (1024 * 1024),
                memory.total_bytes / (1024 * 1024),
                memory.available_bytes / (1024 * 1024)
            );
        }
        None => println!("  {}", "unavailable".dimmed()),
    }

    if let Some(disk) = report.disk.as_ref().filter(|d| !d.drives.is_empty()) {
        print_section_header("\nDrives");
        for drive in &disk.drives {
            println!("  {}", format_drive(drive));
        }
    }

    print_section_header("\nTop 5 processes (CPU)");
    let processes = report
        .cpu
        .as_ref()
        .map(|c| c.top_processes.as_slice())
        .unwrap_or_default();
    println!("{}", format_process_table(processes, 5));

    for alert in [&report.cpu_alert, &report.disk_alert].into_iter().flatten() {
        println!("\n{}", alert.red().bold());
    }
}
