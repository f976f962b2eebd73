use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::severity::Severity;

/// Longest summary kept on a record, in characters.
const MAX_SUMMARY_CHARS: usize = 120;

/// Point-in-time inputs for one root-cause analysis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage_percent: f64,
    pub five_minute_average: f64,
    pub memory_usage_percent: Option<f64>,
    pub top_processes: String,
    pub recent_events: String,
    pub disk_alert: Option<String>,
    pub historical_comparison: String,
}

/// Outcome of one completed or failed analysis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub summary: String,
    pub full_text: String,
    #[serde(default = "default_succeeded")]
    pub succeeded: bool,
}

const fn default_succeeded() -> bool {
    true
}

impl AnalysisRecord {
    /// Wraps the analysis service's answer, inferring severity from its wording.
    #[must_use]
    pub fn from_response(timestamp: DateTime<Utc>, text: &str) -> Self {
        Self {
            timestamp,
            severity: Severity::infer(text),
            summary: summarize(text),
            full_text: text.to_owned(),
            succeeded: true,
        }
    }

    /// Low-severity record standing in for an analysis that did not complete.
    #[must_use]
    pub fn failure(timestamp: DateTime<Utc>, reason: &str) -> Self {
        Self {
            timestamp,
            severity: Severity::Low,
            summary: "Automatic analysis failed".to_string(),
            full_text: format!("Automatic analysis failed: {reason}"),
            succeeded: false,
        }
    }
}

/// First non-blank line, trimmed and cut to `MAX_SUMMARY_CHARS`.
fn summarize(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= MAX_SUMMARY_CHARS {
        line.to_owned()
    } else {
        let mut cut: String = line.chars().take(MAX_SUMMARY_CHARS).collect();
        cut.push('…');
        cut
    }
}
