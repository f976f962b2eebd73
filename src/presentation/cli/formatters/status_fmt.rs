use colored::{ColoredString, Colorize};

use crate::domain::entities::alert::AlertEvent;
use crate::domain::entities::disk::DriveUsage;
use crate::domain::entities::process::ProcessUsage;
use crate::domain::entities::trend::{Stability, TrendSnapshot};

#[must_use]
pub fn progress_bar(value: f64, width: usize) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let bar_filled = "█".repeat(filled);
    let bar_empty = "░".repeat(empty);

    let colored_bar = if value >= 90.0 {
        bar_filled.red().bold()
    } else if value >= 70.0 {
        bar_filled.yellow()
    } else {
        bar_filled.green()
    };

    format!("{colored_bar}{bar_empty}")
}

#[must_use]
pub fn colorize_percent(value: f64) -> ColoredString {
    let text = format!("{value:.1}%");
    if value >= 90.0 {
        text.red().bold()
    } else if value >= 70.0 {
        text.yellow()
    } else {
        text.green()
    }
}

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}

/// `1m / 5m / 15m` averages followed by the range and stability.
#[must_use]
pub fn format_trend(trend: &TrendSnapshot) -> String {
    let stability = match trend.stability {
        Stability::Stable => trend.stability.to_string().green(),
        Stability::Fluctuating => trend.stability.to_string().yellow(),
    };
    format!(
        "avg {:.1}% / {:.1}% / {:.1}% (1m/5m/15m), range {:.1}%..{:.1}%, {stability} over {} samples",
        trend.average_1m,
        trend.average_5m,
        trend.average_15m,
        trend.min,
        trend.max,
        trend.sample_count
    )
}

/// One line per drive: id, bar, percent and free space.
#[must_use]
pub fn format_drive(drive: &DriveUsage) -> String {
    format!(
        "{:<6} {} {} ({:.1} GB free of {:.1} GB)",
        drive.drive_id,
        progress_bar(drive.usage_percent, 20),
        colorize_percent(drive.usage_percent),
        drive.free_gb(),
        drive.total_gb()
    )
}

/// `HH:MM:SS TYPE [resource]: description`, test events dimmed.
#[must_use]
pub fn format_event(event: &AlertEvent) -> String {
    let kind = if event.is_test() {
        event.event_type.dimmed()
    } else {
        event.event_type.red().bold()
    };
    let resource = event
        .related_resource
        .as_deref()
        .map(|r| format!(" [{r}]"))
        .unwrap_or_default();
    format!(
        "{} {kind}{resource}: {}",
        event.start_time.format("%H:%M:%S"),
        event.description
    )
}

#[must_use]
pub fn format_process_table(processes: &[ProcessUsage], limit: usize) -> String {
    if processes.is_empty() {
        return "  (no process data yet)".dimmed().to_string();
    }
    let mut lines = vec![format!(
        "  {:>7}  {:<24} {:>7} {:>10}",
        "PID", "NAME", "CPU", "MEMORY"
    )
    .bold()
    .to_string()];
    for process in processes.iter().take(limit) {
        lines.push(format!(
            "  {:>7}  {:<24} {:>6.1}% {:>7} MB",
            process.pid,
            truncate(&process.name, 24),
            process.cpu_percent,
            process.memory_bytes / (1024 * 1024)
        ));
    }
    lines.join("\n")
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_owned()
    } else {
        let mut cut: String = name.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
