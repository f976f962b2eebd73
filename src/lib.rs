//! Local telemetry, threshold alerting and automatic root-cause analysis for
//! a single factory-floor host.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

pub mod domain {
    pub mod entities;
    pub mod ports;
    pub mod rules;
    pub mod value_objects;
}

pub mod application {
    pub mod config;
    pub mod services {
        pub mod auto_analysis;
        pub mod context;
        pub mod history;
        pub mod monitor;
        pub mod trend;
    }
}

pub mod infrastructure {
    pub mod ai;
    pub mod collectors;
    pub mod notifications;
    pub mod persistence;
}

pub mod presentation {
    pub mod cli {
        pub mod app;
        pub mod commands {
            pub mod daemon;
            pub mod history;
            pub mod status;
        }
        pub mod formatters {
            pub mod history_fmt;
            pub mod status_fmt;
        }
    }
}

/// Lock `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `at + delta`, pinned to the representable range instead of overflowing.
pub(crate) fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// `at - delta`, pinned to the representable range instead of overflowing.
pub(crate) fn saturating_sub(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_sub_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}
