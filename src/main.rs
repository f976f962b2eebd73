use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use floorwatch::application::config::AppConfig;
use floorwatch::application::services::auto_analysis::AutoAnalysisCoordinator;
use floorwatch::application::services::history::AnalysisHistory;
use floorwatch::application::services::monitor::{MonitorCollectors, PerformanceMonitor};
use floorwatch::domain::ports::HistoryStore;
use floorwatch::domain::value_objects::sampling::IntervalBounds;
use floorwatch::infrastructure::ai::create_analysis_service;
use floorwatch::infrastructure::collectors::{
    CpuProbe, DiskProbe, MemoryProbe, PeriodicCollector, SysinfoCpuCounter, SysinfoProcessSource,
};
use floorwatch::infrastructure::persistence::{InMemoryStore, JsonFileHistoryStore};
use floorwatch::presentation::cli::app::{Cli, Commands};
use floorwatch::presentation::cli::commands::daemon::{
    run_daemon, DaemonOptions, DEFAULT_RELOAD_INTERVAL,
};
use floorwatch::presentation::cli::commands::history::run_history;
use floorwatch::presentation::cli::commands::status::run_status;

fn print_banner() {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  FLOORWATCH: line host monitor".bold().cyan());
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_monitor(config: &AppConfig) -> Arc<PerformanceMonitor> {
    let cpu = CpuProbe::new(
        Box::new(SysinfoCpuCounter::new()),
        Box::new(SysinfoProcessSource::new()),
    );
    let collectors = MonitorCollectors {
        cpu: PeriodicCollector::new(cpu, IntervalBounds::FAST),
        memory: PeriodicCollector::new(MemoryProbe::new(), IntervalBounds::FAST),
        disk: PeriodicCollector::new(DiskProbe::new(), IntervalBounds::DISK),
    };
    Arc::new(PerformanceMonitor::new(collectors, config.monitor_settings()))
}

fn open_history(config: &AppConfig) -> Arc<AnalysisHistory> {
    let store: Arc<dyn HistoryStore> = if config.history.is_persistent() {
        Arc::new(JsonFileHistoryStore::new(&config.history.path))
    } else {
        tracing::info!("history path empty, analyses kept in memory only");
        Arc::new(InMemoryStore::new())
    };
    Arc::new(AnalysisHistory::load(
        store,
        config.history.limits(),
        Utc::now(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    // Load configuration
    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load_or_create(&config_path)?;

    // Manual DI: main.rs is the only place that knows concrete types
    match cli.command {
        Some(Commands::Status { json }) => {
            let monitor = build_monitor(&config);
            run_status(&monitor, json).await?;
        }
        Some(Commands::History { limit, json }) => {
            let history = open_history(&config);
            run_history(&history, limit, json)?;
        }
        Some(Commands::Daemon { test_alert }) => {
            start_daemon(&config, config_path, test_alert).await?;
        }
        None => start_daemon(&config, config_path, None).await?,
    }

    Ok(())
}

async fn start_daemon(
    config: &AppConfig,
    config_path: std::path::PathBuf,
    test_alert: Option<u64>,
) -> anyhow::Result<()> {
    print_banner();
    let monitor = build_monitor(config);
    let history = open_history(config);
    let service = create_analysis_service(&config.analysis);
    let coordinator = Arc::new(AutoAnalysisCoordinator::new(
        Arc::clone(&monitor),
        history,
        service,
        config.analysis.coordinator_settings(),
    ));
    let options = DaemonOptions {
        config_path: Some(config_path),
        reload_interval: DEFAULT_RELOAD_INTERVAL,
        test_alert: test_alert.map(Duration::from_secs),
    };
    run_daemon(monitor, coordinator, options).await
}
