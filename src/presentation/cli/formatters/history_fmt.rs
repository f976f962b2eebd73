use colored::Colorize;

use crate::domain::entities::analysis::AnalysisRecord;
use crate::domain::value_objects::severity::Severity;

/// Strips escape characters so provider text cannot drive the terminal.
fn sanitize_terminal(input: &str) -> String {
    input.chars().filter(|c| *c != '\x1b').collect()
}

fn severity_badge(severity: Severity) -> String {
    let label = format!(" {severity} ");
    match severity {
        Severity::High => format!("{}", label.on_red().white().bold()),
        Severity::Medium => format!("{}", label.on_yellow().black()),
        Severity::Low => format!("{}", label.on_blue().white()),
    }
}

/// Header line for one record: local time, severity badge, summary.
#[must_use]
pub fn format_record_header(record: &AnalysisRecord) -> String {
    let time = record
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    let summary = sanitize_terminal(&record.summary);
    let summary = if record.succeeded {
        summary.bold()
    } else {
        summary.dimmed()
    };
    format!("{time} {} {summary}", severity_badge(record.severity))
}

pub fn format_records(records: &[AnalysisRecord], full: bool) {
    for record in records {
        println!();
        println!("{}", format_record_header(record));
        if full {
            for line in sanitize_terminal(&record.full_text).lines() {
                println!("  {}", line.dimmed());
            }
        }
    }
    println!();
}

pub fn print_no_records() {
    println!();
    println!("{}", "No analyses recorded yet".green().bold());
    println!();
}
