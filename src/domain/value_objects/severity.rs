use serde::{Deserialize, Serialize};

/// Severity assigned to an analysis record.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

/// Terms that mark an analysis as high severity.
const HIGH_TERMS: &[&str] = &["critical", "severe", "urgent", "emergency", "fatal"];

/// Terms that mark an analysis as medium severity.
const MEDIUM_TERMS: &[&str] = &["warning", "anomaly", "abnormal", "degraded", "elevated"];

impl Severity {
    /// Infers a severity from free-form analysis text by keyword matching.
    ///
    /// High-class terms win over medium-class terms; text with neither is `Low`.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        if HIGH_TERMS.iter().any(|t| lower.contains(t)) {
            Self::High
        } else if MEDIUM_TERMS.iter().any(|t| lower.contains(t)) {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn color(&self) -> &str {
        match self {
            Self::Low => "blue",
            Self::Medium => "yellow",
            Self::High => "red",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}
