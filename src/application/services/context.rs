//! Assembles the analysis context from the monitor's live view.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::history::AnalysisHistory;
use super::monitor::PerformanceMonitor;
use crate::domain::entities::alert::AlertEvent;
use crate::domain::entities::analysis::AnalysisContext;
use crate::domain::entities::process::ProcessUsage;
use crate::domain::entities::trend::TrendSnapshot;

const CONTEXT_TOP_PROCESSES: usize = 5;
const CONTEXT_RECENT_EVENTS: usize = 10;
const BYTES_PER_MB: u64 = 1_048_576;

/// Snapshot of everything an analysis pass needs, read at `now`.
#[must_use]
pub fn build_context(
    monitor: &PerformanceMonitor,
    history: &AnalysisHistory,
    now: DateTime<Utc>,
) -> AnalysisContext {
    let cpu = monitor.latest_cpu();
    let trend = monitor.trend_at(now);
    let previous = history.latest();

    let mut historical_comparison = describe_trend(&trend);
    match previous {
        Some(record) => {
            let _ = write!(
                historical_comparison,
                "\nPrevious analysis at {} ({}): {}",
                record.timestamp.format("%Y-%m-%d %H:%M UTC"),
                record.severity,
                record.summary
            );
        }
        None => historical_comparison.push_str("\nNo previous analysis on record."),
    }

    AnalysisContext {
        timestamp: now,
        cpu_usage_percent: cpu.as_ref().map_or(0.0, |s| s.total_usage_percent),
        five_minute_average: monitor.five_minute_average_at(now),
        memory_usage_percent: monitor.latest_memory().map(|m| m.usage_percent),
        top_processes: cpu
            .map(|s| describe_processes(&s.top_processes))
            .unwrap_or_else(|| "No CPU sample yet.".to_string()),
        recent_events: describe_events(&monitor.recent_events(CONTEXT_RECENT_EVENTS)),
        disk_alert: monitor.disk_alert(),
        historical_comparison,
    }
}

fn describe_processes(processes: &[ProcessUsage]) -> String {
    if processes.is_empty() {
        return "No process data.".to_string();
    }
    processes
        .iter()
        .take(CONTEXT_TOP_PROCESSES)
        .map(|p| {
            format!(
                "{} (pid {}): {:.1}% CPU, {} MB",
                p.name,
                p.pid,
                p.cpu_percent,
                p.memory_bytes / BYTES_PER_MB
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_events(events: &[AlertEvent]) -> String {
    if events.is_empty() {
        return "No recent events.".to_string();
    }
    events
        .iter()
        .map(|e| {
            let resource = e
                .related_resource
                .as_deref()
                .map(|r| format!(" [{r}]"))
                .unwrap_or_default();
            format!(
                "{} {}{}: {}",
                e.start_time.format("%H:%M:%S"),
                e.event_type,
                resource,
                e.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_trend(trend: &TrendSnapshot) -> String {
    format!(
        "CPU averages: 1 min {:.1}%, 5 min {:.1}%, 15 min {:.1}% over {} samples; \
         range {:.1}% to {:.1}% ({:.1} points, {})",
        trend.average_1m,
        trend.average_5m,
        trend.average_15m,
        trend.sample_count,
        trend.min,
        trend.max,
        trend.fluctuation,
        trend.stability
    )
}
