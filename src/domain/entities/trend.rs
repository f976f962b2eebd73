use serde::{Deserialize, Serialize};

/// Coarse classification of how much CPU usage moved within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    Stable,
    Fluctuating,
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "Stable"),
            Self::Fluctuating => write!(f, "Fluctuating"),
        }
    }
}

/// Rolling CPU statistics derived from the last 15 minutes of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub average_1m: f64,
    pub average_5m: f64,
    pub average_15m: f64,
    pub max: f64,
    pub min: f64,
    pub fluctuation: f64,
    pub stability: Stability,
    pub sample_count: usize,
}
