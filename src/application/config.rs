use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::services::auto_analysis::CoordinatorSettings;
use crate::application::services::history::HistoryLimits;
use crate::application::services::monitor::MonitorSettings;
use crate::domain::value_objects::sampling::IntervalBounds;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Collector cadences. Out-of-range values are clamped when applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_fast_interval_ms")]
    pub cpu_interval_ms: u64,
    #[serde(default = "default_fast_interval_ms")]
    pub memory_interval_ms: u64,
    #[serde(default = "default_disk_interval_secs")]
    pub disk_interval_secs: u64,
}

/// Alert thresholds, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_cpu_total")]
    pub cpu_total_percent: f64,
    #[serde(default = "default_disk_usage")]
    pub disk_usage_percent: f64,
}

/// Automatic root-cause analysis settings (claude-cli or noop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_claude_binary")]
    pub claude_binary: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_dedup_retention")]
    pub dedup_retention_secs: u64,
}

/// Analysis history file (tilde-expanded at point of use). An empty path
/// keeps history in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

// --- Defaults ---

#[allow(clippy::cast_possible_truncation)]
const fn default_fast_interval_ms() -> u64 {
    IntervalBounds::FAST.default.as_millis() as u64
}

const fn default_disk_interval_secs() -> u64 {
    IntervalBounds::DISK.default.as_secs()
}

const fn default_cpu_total() -> f64 {
    80.0
}

const fn default_disk_usage() -> f64 {
    90.0
}

const fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "claude-cli".into()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}

fn default_claude_binary() -> String {
    "claude".into()
}

const fn default_timeout() -> u64 {
    120
}

const fn default_cooldown() -> u64 {
    7200
}

const fn default_dedup_retention() -> u64 {
    1800
}

// NOTE: Stored as raw string with tilde; expanded by the JSON store.
fn default_history_path() -> String {
    "~/.local/share/floorwatch/analysis_history.json".into()
}

const fn default_retention_days() -> u32 {
    7
}

const fn default_max_records() -> usize {
    200
}

// --- Default impls ---

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_interval_ms: default_fast_interval_ms(),
            memory_interval_ms: default_fast_interval_ms(),
            disk_interval_secs: default_disk_interval_secs(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_total_percent: default_cpu_total(),
            disk_usage_percent: default_disk_usage(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            provider: default_provider(),
            model: default_model(),
            claude_binary: default_claude_binary(),
            timeout_secs: default_timeout(),
            cooldown_secs: default_cooldown(),
            dedup_retention_secs: default_dedup_retention(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            retention_days: default_retention_days(),
            max_records: default_max_records(),
        }
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "created default configuration");
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// `<config dir>/floorwatch/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("floorwatch").join("config.toml"))
    }

    #[must_use]
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            cpu_interval: IntervalBounds::FAST
                .clamp(Duration::from_millis(self.sampling.cpu_interval_ms)),
            memory_interval: IntervalBounds::FAST
                .clamp(Duration::from_millis(self.sampling.memory_interval_ms)),
            disk_interval: IntervalBounds::DISK
                .clamp(Duration::from_secs(self.sampling.disk_interval_secs)),
            thresholds: ThresholdSet::from(&self.thresholds),
        }
    }
}

impl From<&ThresholdConfig> for ThresholdSet {
    fn from(config: &ThresholdConfig) -> Self {
        Self::new(config.cpu_total_percent, config.disk_usage_percent)
    }
}

impl AnalysisConfig {
    /// Cooldown and dedup retention as chrono durations, capped at
    /// [`MAX_ANALYSIS_WINDOW_SECS`].
    #[must_use]
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            cooldown: seconds(self.cooldown_secs),
            retention: seconds(self.dedup_retention_secs),
        }
    }
}

impl HistoryConfig {
    /// At least one day and one record are always kept; retention is capped
    /// at [`MAX_HISTORY_RETENTION_DAYS`].
    #[must_use]
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            retention: chrono::Duration::days(i64::from(
                self.retention_days.clamp(1, MAX_HISTORY_RETENTION_DAYS),
            )),
            max_records: self.max_records.max(1),
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !self.path.trim().is_empty()
    }
}

/// Longest accepted cooldown or dedup retention (30 days).
pub const MAX_ANALYSIS_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Longest accepted history retention (10 years).
pub const MAX_HISTORY_RETENTION_DAYS: u32 = 3650;

fn seconds(secs: u64) -> chrono::Duration {
    let capped = secs.min(MAX_ANALYSIS_WINDOW_SECS);
    chrono::Duration::seconds(i64::try_from(capped).unwrap_or(i64::MAX / 1_000))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_sensible_values() {
        let config = AppConfig::default();
        assert_eq!(config.sampling.cpu_interval_ms, 1000);
        assert_eq!(config.sampling.memory_interval_ms, 1000);
        assert_eq!(config.sampling.disk_interval_secs, 15);
        assert!((config.thresholds.cpu_total_percent - 80.0).abs() < f64::EPSILON);
        assert!((config.thresholds.disk_usage_percent - 90.0).abs() < f64::EPSILON);
        assert!(config.analysis.enabled);
        assert_eq!(config.analysis.provider, "claude-cli");
        assert_eq!(config.analysis.claude_binary, "claude");
        assert_eq!(config.analysis.timeout_secs, 120);
        assert_eq!(config.analysis.cooldown_secs, 7200);
        assert_eq!(config.analysis.dedup_retention_secs, 1800);
        assert_eq!(
            config.history.path,
            "~/.local/share/floorwatch/analysis_history.json"
        );
        assert_eq!(config.history.retention_days, 7);
        assert_eq!(config.history.max_records, 200);
    }

    #[test]
    fn serde_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let deserialized: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(deserialized, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("parse empty toml");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_toml_fills_missing_with_defaults() {
        let toml_str = r#"
[thresholds]
disk_usage_percent = 85

[analysis]
provider = "noop"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse partial toml");
        assert!((config.thresholds.disk_usage_percent - 85.0).abs() < f64::EPSILON);
        assert!((config.thresholds.cpu_total_percent - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.analysis.provider, "noop");
        assert_eq!(config.analysis.cooldown_secs, 7200);
        assert_eq!(config.sampling, SamplingConfig::default());
    }

    #[test]
    fn load_from_file() {
        let toml_str = r#"
[sampling]
cpu_interval_ms = 500

[analysis]
enabled = false

[history]
path = ""
"#;
        let mut tmpfile = tempfile::NamedTempFile::new().expect("create tempfile");
        tmpfile
            .write_all(toml_str.as_bytes())
            .expect("write tmpfile");

        let config = AppConfig::load_from(tmpfile.path()).expect("load from file");
        assert_eq!(config.sampling.cpu_interval_ms, 500);
        assert!(!config.analysis.enabled);
        assert!(!config.history.is_persistent());
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = AppConfig::default_path().expect("config path");
        assert!(path.ends_with("floorwatch/config.toml"));
    }

    #[test]
    fn load_or_create_creates_default_when_missing() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("floorwatch").join("config.toml");

        assert!(!path.exists());
        let config = AppConfig::load_or_create(&path).expect("load_or_create");
        assert!(path.exists());
        assert_eq!(config, AppConfig::default());

        let reloaded = AppConfig::load_from(&path).expect("reload created file");
        assert_eq!(reloaded, config);
    }

    #[test]
    fn load_or_create_loads_existing_file() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sampling]\ndisk_interval_secs = 20\n").expect("write");

        let config = AppConfig::load_or_create(&path).expect("load_or_create");
        assert_eq!(config.sampling.disk_interval_secs, 20);
    }

    #[test]
    fn invalid_toml_fails() {
        let mut tmpfile = tempfile::NamedTempFile::new().expect("create tempfile");
        tmpfile
            .write_all(b"this is not valid toml [[[")
            .expect("write");
        assert!(AppConfig::load_from(tmpfile.path()).is_err());
    }

    #[test]
    fn load_from_nonexistent_file_fails() {
        let dir = tempfile::tempdir().expect("create tempdir");
        assert!(AppConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn monitor_settings_clamp_intervals_and_thresholds() {
        let config = AppConfig {
            sampling: SamplingConfig {
                cpu_interval_ms: 10,
                memory_interval_ms: 60_000,
                disk_interval_secs: 3,
            },
            thresholds: ThresholdConfig {
                cpu_total_percent: 150.0,
                disk_usage_percent: -1.0,
            },
            ..AppConfig::default()
        };
        let settings = config.monitor_settings();
        assert_eq!(settings.cpu_interval, Duration::from_millis(250));
        assert_eq!(settings.memory_interval, Duration::from_secs(10));
        assert_eq!(settings.disk_interval, Duration::from_secs(10));
        assert!((settings.thresholds.cpu_total - 100.0).abs() < f64::EPSILON);
        assert!(settings.thresholds.disk_usage.abs() < f64::EPSILON);
    }

    #[test]
    fn default_settings_match_domain_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.monitor_settings(), MonitorSettings::default());
        assert_eq!(
            config.analysis.coordinator_settings(),
            CoordinatorSettings::default()
        );
        assert_eq!(config.history.limits(), HistoryLimits::default());
    }

    #[test]
    fn history_limits_never_zero() {
        let config = HistoryConfig {
            retention_days: 0,
            max_records: 0,
            ..HistoryConfig::default()
        };
        let limits = config.limits();
        assert_eq!(limits.retention, chrono::Duration::days(1));
        assert_eq!(limits.max_records, 1);
    }

    #[test]
    fn oversized_windows_are_capped() {
        let mut config = AppConfig::default();
        config.analysis.cooldown_secs = u64::MAX;
        config.analysis.dedup_retention_secs = u64::MAX;
        config.history.retention_days = u32::MAX;

        let settings = config.analysis.coordinator_settings();
        let cap = chrono::Duration::days(30);
        assert_eq!(settings.cooldown, cap);
        assert_eq!(settings.retention, cap);
        assert_eq!(
            config.history.limits().retention,
            chrono::Duration::days(3650)
        );
    }
}
