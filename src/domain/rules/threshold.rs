use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// Bookkeeping for a key currently at or above the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEntry {
    pub since: DateTime<Utc>,
    pub last_value: f64,
}

/// Result of feeding one observation into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Crossed from below to at/above: the only transition that emits an event.
    Raised,
    /// Still at/above; no event.
    Held,
    /// Dropped below; the entry was removed.
    Cleared,
    /// Below and already inactive.
    Idle,
}

/// Edge-triggered per-key threshold detector.
///
/// Holds at most one active entry per key. The CPU rule uses a single `()`
/// key, the disk rule keys by drive id.
#[derive(Debug, Clone)]
pub struct ThresholdStateMachine<K> {
    threshold: f64,
    active: HashMap<K, ActiveEntry>,
}

impl<K: Eq + Hash + Clone> ThresholdStateMachine<K> {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            active: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Feed one observation for `key` taken at `at`.
    pub fn observe(&mut self, key: K, value: f64, at: DateTime<Utc>) -> Transition {
        if value >= self.threshold {
            if let Some(entry) = self.active.get_mut(&key) {
                entry.last_value = value;
                Transition::Held
            } else {
                self.active.insert(
                    key,
                    ActiveEntry {
                        since: at,
                        last_value: value,
                    },
                );
                Transition::Raised
            }
        } else if self.active.remove(&key).is_some() {
            Transition::Cleared
        } else {
            Transition::Idle
        }
    }

    /// Drop entries whose key is not accepted by `present`. Returns how many
    /// entries were evicted.
    pub fn retain_present<F>(&mut self, present: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let before = self.active.len();
        self.active.retain(|key, _| present(key));
        before - self.active.len()
    }

    /// Forget every active entry.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Install a new threshold. All state is discarded; no re-evaluation happens.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
        self.reset();
    }

    #[must_use]
    pub fn is_active(&self, key: &K) -> bool {
        self.active.contains_key(key)
    }

    #[must_use]
    pub fn entry(&self, key: &K) -> Option<&ActiveEntry> {
        self.active.get(key)
    }

    pub fn active(&self) -> impl Iterator<Item = (&K, &ActiveEntry)> {
        self.active.iter()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
