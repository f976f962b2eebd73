use serde::{Deserialize, Serialize};

/// One process's contribution to host resource usage within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    /// Share of total host CPU capacity, in [0, 100].
    pub cpu_percent: f64,
    /// Resident memory in bytes.
    pub memory_bytes: u64,
}

/// Keeps the `n` entries with the highest `key`, sorted descending.
pub fn rank_top<F>(mut items: Vec<ProcessUsage>, n: usize, key: F) -> Vec<ProcessUsage>
where
    F: Fn(&ProcessUsage) -> f64,
{
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
    items.truncate(n);
    items
}
