use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

use crate::application::config::AppConfig;
use crate::application::services::auto_analysis::AutoAnalysisCoordinator;
use crate::application::services::monitor::PerformanceMonitor;
use crate::domain::value_objects::thresholds::clamp_percent;
use crate::presentation::cli::formatters::status_fmt::format_event;

/// How often the config file is re-read for threshold changes.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Config file re-read for the disk threshold; `None` disables reloads.
    pub config_path: Option<PathBuf>,
    pub reload_interval: Duration,
    /// Raise a `[TEST]` CPU alert for this long right after startup.
    pub test_alert: Option<Duration>,
}

/// Run monitoring and automatic analysis until Ctrl+C.
///
/// Note: SIGTERM is **not** handled. Add a handler via
/// `tokio::signal::unix::signal(SignalKind::terminate())` if a service
/// manager needs it.
///
/// # Errors
///
/// Returns an error if listening for Ctrl+C fails.
pub async fn run_daemon(
    monitor: Arc<PerformanceMonitor>,
    coordinator: Arc<AutoAnalysisCoordinator>,
    options: DaemonOptions,
) -> anyhow::Result<()> {
    run_daemon_until(monitor, coordinator, options, tokio::signal::ctrl_c()).await
}

/// Same as [`run_daemon`], stopping when `shutdown` resolves.
///
/// # Errors
///
/// Returns the error `shutdown` resolved with, after stopping everything.
pub async fn run_daemon_until<F>(
    monitor: Arc<PerformanceMonitor>,
    coordinator: Arc<AutoAnalysisCoordinator>,
    options: DaemonOptions,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut events = monitor.subscribe_events();
    let mut completed = coordinator.subscribe_completed();
    let analysis = coordinator.run(monitor.subscribe_events());

    let (threshold_tx, threshold_rx) = watch::channel(monitor.disk_threshold());
    let threshold_task = monitor.watch_disk_threshold(threshold_rx);

    monitor.start();
    let settings = monitor.settings();
    tracing::info!(
        cpu_interval = ?settings.cpu_interval,
        memory_interval = ?settings.memory_interval,
        disk_interval = ?settings.disk_interval,
        cpu_threshold = settings.thresholds.cpu_total,
        disk_threshold = settings.thresholds.disk_usage,
        "daemon started"
    );

    if let Some(duration) = options.test_alert {
        let event = monitor.trigger_test_alert(duration);
        println!("{}", format_event(&event));
    }

    let mut reload = tokio::time::interval_at(
        tokio::time::Instant::now() + options.reload_interval,
        options.reload_interval,
    );
    reload.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            batch = events.recv() => match batch {
                Ok(batch) => {
                    for event in &batch {
                        println!("{}", format_event(event));
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event printer fell behind");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            record = completed.recv() => match record {
                Ok(record) => {
                    tracing::info!(
                        severity = %record.severity,
                        succeeded = record.succeeded,
                        summary = %record.summary,
                        "analysis recorded"
                    );
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "completion printer fell behind");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            _ = reload.tick(), if options.config_path.is_some() => {
                if let Some(path) = &options.config_path {
                    reload_disk_threshold(path, &threshold_tx);
                }
            }
            signal = &mut shutdown => break signal,
        }
    };

    println!("\nStopping floorwatch...");
    monitor.stop();
    analysis.abort();
    threshold_task.abort();
    outcome.context("failed to listen for the shutdown signal")
}

/// Re-reads the config file and pushes a changed disk threshold.
fn reload_disk_threshold(path: &std::path::Path, threshold: &watch::Sender<f64>) {
    match AppConfig::load_from(path) {
        Ok(config) => {
            let next = clamp_percent(config.thresholds.disk_usage_percent);
            let changed = threshold.send_if_modified(|current| {
                if (*current - next).abs() < f64::EPSILON {
                    false
                } else {
                    *current = next;
                    true
                }
            });
            if changed {
                tracing::info!(disk_threshold = next, "disk threshold reloaded");
            }
        }
        Err(e) => tracing::warn!("config reload failed, keeping current thresholds: {e:#}"),
    }
}
