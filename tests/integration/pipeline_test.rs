use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use floorwatch::application::services::auto_analysis::TriggerOutcome;
use floorwatch::application::services::monitor::TEST_MARKER;
use floorwatch::domain::entities::alert::{CPU_TOTAL_HIGH, CPU_TOTAL_HIGH_TEST, DISK_USAGE_HIGH};
use floorwatch::domain::entities::snapshot::CpuSnapshot;
use floorwatch::domain::value_objects::severity::Severity;
use floorwatch::infrastructure::ai::noop::NoopAnalysisService;

use crate::support::{
    coordinator, dialed_monitor, disk_snapshot, drive, eventually, memory_history, GatedService,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn live_cpu_spike_produces_one_analysis() {
    let (monitor, _dial) = dialed_monitor(97.0);
    let history = memory_history();
    let coordinator = coordinator(&monitor, &history, Arc::new(NoopAnalysisService::new()));
    let mut completed = coordinator.subscribe_completed();
    let analysis = coordinator.run(monitor.subscribe_events());

    monitor.start();
    let record = tokio::time::timeout(WAIT, completed.recv())
        .await
        .expect("analysis completes in time")
        .expect("completion channel open");
    monitor.stop();
    analysis.abort();

    assert!(record.succeeded);
    assert!(record.summary.starts_with("Local summary: CPU 97.0%"));
    assert!(monitor.is_cpu_alert_active());
    assert!(eventually(WAIT, || history.len() == 1).await);

    // Edge-triggered: staying above the threshold raises nothing new.
    let cpu_events = monitor
        .events()
        .iter()
        .filter(|e| e.event_type == CPU_TOTAL_HIGH)
        .count();
    assert_eq!(cpu_events, 1);
}

#[tokio::test]
async fn cpu_alert_clears_when_usage_drops() {
    let (monitor, dial) = dialed_monitor(92.0);
    monitor.refresh().await;
    assert!(monitor.is_cpu_alert_active());

    *dial.lock().expect("dial lock") = 20.0;
    monitor.refresh().await;
    assert!(!monitor.is_cpu_alert_active());

    *dial.lock().expect("dial lock") = 95.0;
    monitor.refresh().await;
    let raised = monitor
        .events()
        .iter()
        .filter(|e| e.event_type == CPU_TOTAL_HIGH)
        .count();
    assert_eq!(raised, 2);
}

#[tokio::test]
async fn test_alert_shows_banner_and_never_analyzes() {
    let (monitor, _dial) = dialed_monitor(5.0);
    let history = memory_history();
    let service = GatedService::new(10);
    let coordinator = coordinator(&monitor, &history, Arc::clone(&service) as _);
    let mut batches = monitor.subscribe_events();

    let now = Utc::now();
    let event = monitor.trigger_test_alert_at(Duration::from_secs(30), now);
    assert_eq!(event.event_type, CPU_TOTAL_HIGH_TEST);

    let banner = monitor
        .cpu_alert_at(now + chrono::Duration::seconds(10))
        .expect("test banner visible");
    assert!(banner.starts_with(TEST_MARKER));
    assert!(monitor
        .cpu_alert_at(now + chrono::Duration::seconds(31))
        .is_none());

    let batch = batches.recv().await.expect("test batch published");
    assert_eq!(coordinator.handle_batch(&batch), TriggerOutcome::Ignored);
    assert_eq!(service.calls(), 0);
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_alert_leaves_rule_state_alone() {
    let (monitor, _dial) = dialed_monitor(5.0);
    monitor.trigger_test_alert(Duration::from_secs(60));

    // A real spike after the test alert still raises a real event.
    let events = monitor.on_cpu_snapshot(&CpuSnapshot::new(Utc::now(), 96.0, 4, Vec::new()));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, CPU_TOTAL_HIGH);
}

#[tokio::test]
async fn triggers_during_a_pass_collapse_into_one_follow_up() {
    let (monitor, _dial) = dialed_monitor(5.0);
    let history = memory_history();
    let service = GatedService::new(0);
    let coordinator = coordinator(&monitor, &history, Arc::clone(&service) as _);
    let mut completed = coordinator.subscribe_completed();

    let first = monitor.on_cpu_snapshot(&CpuSnapshot::new(Utc::now(), 91.0, 4, Vec::new()));
    assert_eq!(coordinator.handle_batch(&first), TriggerOutcome::Started);
    assert!(eventually(WAIT, || service.calls() == 1).await);

    for id in ["C:", "D:", "E:"] {
        let raised = monitor.on_disk_snapshot(&disk_snapshot(vec![drive(id, 97.0)]));
        assert_eq!(raised[0].event_type, DISK_USAGE_HIGH);
        assert_eq!(coordinator.handle_batch(&raised), TriggerOutcome::Coalesced);
    }

    service.gate.add_permits(10);
    for _ in 0..2 {
        tokio::time::timeout(WAIT, completed.recv())
            .await
            .expect("pass completes")
            .expect("completion channel open");
    }

    assert!(eventually(WAIT, || !coordinator.is_running()).await);
    assert_eq!(service.calls(), 2);
    assert_eq!(history.len(), 2);
    let newest = history.latest().expect("follow-up recorded");
    assert_eq!(newest.severity, Severity::Medium);
    assert!(newest.summary.starts_with("Warning: pass 2"));
}

#[tokio::test]
async fn repeated_trigger_within_cooldown_is_ignored() {
    let (monitor, _dial) = dialed_monitor(5.0);
    let history = memory_history();
    let service = GatedService::new(10);
    let coordinator = coordinator(&monitor, &history, Arc::clone(&service) as _);

    let t0 = Utc::now();
    let batch = monitor.on_disk_snapshot(&disk_snapshot(vec![drive("D:", 95.0)]));
    assert_eq!(coordinator.handle_batch_at(&batch, t0), TriggerOutcome::Started);
    assert!(eventually(WAIT, || !coordinator.is_running()).await);

    let later = t0 + chrono::Duration::minutes(10);
    assert_eq!(
        coordinator.handle_batch_at(&batch, later),
        TriggerOutcome::Ignored
    );
    assert_eq!(service.calls(), 1);
    assert_eq!(coordinator.tracked_keys(), 1);
}

#[tokio::test]
async fn disk_threshold_follows_config_channel() {
    let (monitor, _dial) = dialed_monitor(5.0);
    monitor.on_disk_snapshot(&disk_snapshot(vec![drive("D:", 85.0)]));
    assert!(monitor.disk_alert().is_none());

    let (tx, rx) = watch::channel(90.0);
    let task = monitor.watch_disk_threshold(rx);
    tx.send(80.0).expect("watcher alive");
    assert!(eventually(WAIT, || (monitor.disk_threshold() - 80.0).abs() < f64::EPSILON).await);

    // State was reset: the same reading is now a fresh crossing.
    let raised = monitor.on_disk_snapshot(&disk_snapshot(vec![drive("D:", 85.0)]));
    assert_eq!(raised.len(), 1);
    assert!(monitor
        .disk_alert()
        .expect("drive in alert")
        .contains("Drive D:"));
    task.abort();
}

#[tokio::test]
async fn oversized_test_alert_is_accepted_and_ignored() {
    let (monitor, _dial) = dialed_monitor(5.0);
    let history = memory_history();
    let service = GatedService::new(10);
    let coordinator = coordinator(&monitor, &history, Arc::clone(&service) as _);
    let mut batches = monitor.subscribe_events();

    monitor.trigger_test_alert(Duration::from_secs(1_000_000_000_000_000));
    let banner = monitor.cpu_alert().expect("test banner visible");
    assert!(banner.starts_with(TEST_MARKER));

    let batch = batches.recv().await.expect("test batch published");
    assert_eq!(coordinator.handle_batch(&batch), TriggerOutcome::Ignored);
    assert_eq!(service.calls(), 0);
}
