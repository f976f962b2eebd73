use chrono::{DateTime, Utc};
use sysinfo::Disks;

use crate::domain::entities::disk::DriveUsage;
use crate::domain::entities::snapshot::{safe_percent, DiskSnapshot};
use crate::domain::ports::collector::{CollectionError, SnapshotProbe};

/// Filesystem types to exclude from disk metrics.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "sysfs",
    "proc",
    "cgroup2",
    "overlay",
    "squashfs",
    "efivarfs",
    "bpf",
    "hugetlbfs",
    "mqueue",
    "pstore",
    "securityfs",
    "debugfs",
    "tracefs",
    "fusectl",
    "rpc_pipefs",
];

/// One mounted volume as reported by the OS, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedVolume {
    pub mount_point: String,
    pub name: String,
    pub filesystem: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub removable: bool,
}

/// Enumerates fixed drives on every pass.
///
/// The volume list is rebuilt each time so drives mounted or removed since
/// the last pass are picked up.
#[derive(Debug, Default)]
pub struct DiskProbe;

impl DiskProbe {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotProbe for DiskProbe {
    type Snapshot = DiskSnapshot;

    fn name(&self) -> &'static str {
        "disk"
    }

    fn capture(&mut self) -> Result<DiskSnapshot, CollectionError> {
        let disks = Disks::new_with_refreshed_list();
        let volumes = disks.iter().map(|disk| MountedVolume {
            mount_point: disk.mount_point().to_string_lossy().into_owned(),
            name: disk.name().to_string_lossy().into_owned(),
            filesystem: disk.file_system().to_string_lossy().into_owned(),
            total_bytes: disk.total_space(),
            available_bytes: disk.available_space(),
            removable: disk.is_removable(),
        });
        Ok(DiskSnapshot {
            timestamp: Utc::now(),
            drives: fixed_drives(volumes),
        })
    }

    fn fallback(&self, previous: Option<&DiskSnapshot>, at: DateTime<Utc>) -> DiskSnapshot {
        previous.map_or_else(|| DiskSnapshot::zeroed(at), |p| p.restamped(at))
    }
}

/// Keeps fixed, real, non-empty volumes, one entry per drive id.
pub fn fixed_drives(volumes: impl IntoIterator<Item = MountedVolume>) -> Vec<DriveUsage> {
    let mut drives: Vec<DriveUsage> = Vec::new();
    for volume in volumes {
        if volume.removable
            || volume.total_bytes == 0
            || PSEUDO_FILESYSTEMS.contains(&volume.filesystem.as_str())
        {
            tracing::trace!(mount = %volume.mount_point, "skipping volume");
            continue;
        }
        let usage = drive_usage(volume);
        if drives.iter().any(|d| d.drive_id == usage.drive_id) {
            continue;
        }
        drives.push(usage);
    }
    drives
}

fn drive_usage(volume: MountedVolume) -> DriveUsage {
    let total = volume.total_bytes;
    let free = volume.available_bytes.min(total);
    let used = total - free;
    DriveUsage {
        drive_id: drive_id(&volume.mount_point),
        label: if volume.name.is_empty() {
            volume.mount_point
        } else {
            volume.name
        },
        filesystem: volume.filesystem,
        total_bytes: total,
        free_bytes: free,
        used_bytes: used,
        usage_percent: safe_percent(used, total),
    }
}

/// `C:\` becomes `C:`, `/data/` becomes `/data`; `/` stays `/`.
fn drive_id(mount_point: &str) -> String {
    let trimmed = mount_point.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        mount_point.chars().take(1).collect()
    } else {
        trimmed.to_string()
    }
}
