use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::trend::{Stability, TrendSnapshot};
use crate::domain::value_objects::thresholds::clamp_percent;
use crate::{lock_or_recover, saturating_sub};

/// Fluctuation, in percentage points, at which usage counts as unstable.
pub const FLUCTUATION_THRESHOLD: f64 = 10.0;

/// Time-tagged percentages bounded to a fixed span of history.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    span: Duration,
    samples: VecDeque<(DateTime<Utc>, f64)>,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(span: Duration) -> Self {
        Self {
            span,
            samples: VecDeque::new(),
        }
    }

    /// Appends a clamped sample, then drops everything older than `at - span`.
    pub fn push(&mut self, at: DateTime<Utc>, value: f64) {
        self.samples.push_back((at, clamp_percent(value)));
        self.trim(at);
    }

    /// Drops samples older than `now - span`.
    pub fn trim(&mut self, now: DateTime<Utc>) {
        let cutoff = saturating_sub(now, self.span);
        self.samples.retain(|(at, _)| *at >= cutoff);
    }

    /// Mean of all retained samples, 0 when empty.
    #[must_use]
    pub fn average(&self) -> f64 {
        mean(self.samples.iter().map(|(_, v)| *v))
    }

    /// Mean of the samples taken at or after `now - window`, 0 when none.
    #[must_use]
    pub fn average_within(&self, now: DateTime<Utc>, window: Duration) -> f64 {
        let cutoff = saturating_sub(now, window);
        mean(
            self.samples
                .iter()
                .filter(|(at, _)| *at >= cutoff)
                .map(|(_, v)| *v),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|(_, v)| *v)
    }

    #[must_use]
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().map(|(at, _)| *at).min()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sliding 1/5/15-minute statistics over total CPU usage.
pub struct CpuTrendAnalyzer {
    window: Mutex<TimeWindow>,
}

impl Default for CpuTrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTrendAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: Mutex::new(TimeWindow::new(Duration::minutes(15))),
        }
    }

    /// Records one sample and returns the recomputed statistics.
    pub fn update(&self, usage_percent: f64, at: DateTime<Utc>) -> TrendSnapshot {
        let mut window = lock_or_recover(&self.window);
        window.push(at, usage_percent);
        compute(&window, at)
    }

    /// Statistics as of `now`, without recording a sample.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TrendSnapshot {
        let mut window = lock_or_recover(&self.window);
        window.trim(now);
        compute(&window, now)
    }

    /// Timestamp of the oldest retained sample.
    #[must_use]
    pub fn oldest_sample(&self) -> Option<DateTime<Utc>> {
        lock_or_recover(&self.window).oldest()
    }
}

fn compute(window: &TimeWindow, now: DateTime<Utc>) -> TrendSnapshot {
    let max = window.values().fold(f64::NEG_INFINITY, f64::max);
    let min = window.values().fold(f64::INFINITY, f64::min);
    let (max, min) = if window.is_empty() {
        (0.0, 0.0)
    } else {
        (max, min.min(max))
    };
    let fluctuation = max - min;

    TrendSnapshot {
        average_1m: window.average_within(now, Duration::minutes(1)),
        average_5m: window.average_within(now, Duration::minutes(5)),
        average_15m: window.average_within(now, Duration::minutes(15)),
        max,
        min,
        fluctuation,
        stability: if fluctuation >= FLUCTUATION_THRESHOLD {
            Stability::Fluctuating
        } else {
            Stability::Stable
        },
        sample_count: window.len(),
    }
}
