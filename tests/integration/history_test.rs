use std::sync::Arc;

use chrono::{Duration, Utc};

use floorwatch::application::services::history::{AnalysisHistory, HistoryLimits};
use floorwatch::domain::entities::analysis::AnalysisRecord;
use floorwatch::domain::ports::HistoryStore;
use floorwatch::infrastructure::ai::noop::NoopAnalysisService;
use floorwatch::infrastructure::persistence::JsonFileHistoryStore;

use crate::support::{coordinator, dialed_monitor, drive, disk_snapshot, history_on, eventually};

fn json_store(dir: &tempfile::TempDir) -> Arc<JsonFileHistoryStore> {
    let path = dir.path().join("floorwatch").join("analysis_history.json");
    Arc::new(JsonFileHistoryStore::new(
        path.to_str().expect("utf-8 path"),
    ))
}

#[test]
fn restart_trims_expired_and_excess_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = json_store(&dir);
    let now = Utc::now();

    let mut seeded: Vec<AnalysisRecord> = (0..8)
        .map(|i| AnalysisRecord::from_response(now - Duration::hours(i), &format!("hour {i}")))
        .collect();
    seeded.push(AnalysisRecord::from_response(
        now - Duration::days(8),
        "last week",
    ));
    // Stored out of order on purpose.
    seeded.reverse();
    store.save(&seeded).expect("seed history");

    let limits = HistoryLimits {
        retention: Duration::days(7),
        max_records: 5,
    };
    let history = AnalysisHistory::load(Arc::clone(&store) as _, limits, now);

    let records = history.records();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].summary, "hour 0");
    assert_eq!(records[4].summary, "hour 4");
    assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[test]
fn appended_records_survive_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = json_store(&dir);
    let now = Utc::now();

    let history = AnalysisHistory::load(Arc::clone(&store) as _, HistoryLimits::default(), now);
    history.append_at(AnalysisRecord::from_response(now, "Warning: first"), now);
    history.append_at(
        AnalysisRecord::failure(now + Duration::seconds(1), "service unavailable"),
        now + Duration::seconds(1),
    );
    assert!(store.path().exists());

    let reloaded = AnalysisHistory::load(store as _, HistoryLimits::default(), now);
    let records = reloaded.records();
    assert_eq!(records.len(), 2);
    assert!(!records[0].succeeded);
    assert_eq!(records[1].summary, "Warning: first");
}

#[test]
fn corrupt_history_file_starts_empty_and_recovers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = json_store(&dir);
    std::fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
    std::fs::write(store.path(), "[{ broken").expect("write");

    let now = Utc::now();
    let history = AnalysisHistory::load(Arc::clone(&store) as _, HistoryLimits::default(), now);
    assert!(history.is_empty());

    history.append_at(AnalysisRecord::from_response(now, "fresh start"), now);
    let persisted = store.load().expect("file rewritten as valid JSON");
    assert_eq!(persisted.len(), 1);
}

#[tokio::test]
async fn disk_alert_analysis_is_persisted_to_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = json_store(&dir);
    let history = history_on(Arc::clone(&store) as _);
    let (monitor, _dial) = dialed_monitor(10.0);
    let coordinator = coordinator(&monitor, &history, Arc::new(NoopAnalysisService::new()));

    let batch = monitor.on_disk_snapshot(&disk_snapshot(vec![drive("/srv", 96.0)]));
    coordinator.handle_batch(&batch);

    let limit = std::time::Duration::from_secs(5);
    assert!(eventually(limit, || store.load().is_ok_and(|r| r.len() == 1)).await);
    let records = store.load().expect("load persisted history");
    assert!(records[0].full_text.contains("Disk alerts"));
    assert!(records[0].full_text.contains("Drive /srv"));
}
