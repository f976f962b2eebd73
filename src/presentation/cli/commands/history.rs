use crate::application::services::history::AnalysisHistory;
use crate::domain::entities::analysis::AnalysisRecord;
use crate::presentation::cli::formatters::history_fmt::{format_records, print_no_records};

/// The `limit` newest records.
#[must_use]
pub fn newest_records(history: &AnalysisHistory, limit: usize) -> Vec<AnalysisRecord> {
    let mut records = history.records();
    records.truncate(limit);
    records
}

/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run_history(history: &AnalysisHistory, limit: usize, json: bool) -> anyhow::Result<()> {
    let records = newest_records(history, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        print_no_records();
    } else {
        format_records(&records, limit <= 3);
    }
    Ok(())
}
