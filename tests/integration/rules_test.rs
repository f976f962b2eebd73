use chrono::{Duration, Utc};

use floorwatch::application::services::trend::CpuTrendAnalyzer;
use floorwatch::domain::entities::alert::{CPU_TOTAL_HIGH, DISK_USAGE_HIGH};
use floorwatch::domain::entities::snapshot::CpuSnapshot;
use floorwatch::domain::entities::trend::Stability;
use floorwatch::domain::rules::{CpuTotalRule, DiskUsageRule, Rule};

use crate::support::{disk_snapshot, drive};

#[test]
fn cpu_rule_raises_once_per_crossing() {
    let rule = CpuTotalRule::new(80.0);
    let start = Utc::now();
    let readings = [50.0, 80.0, 95.0, 85.0, 79.9, 81.0, 99.0];

    let raised: Vec<usize> = readings
        .iter()
        .enumerate()
        .filter_map(|(i, usage)| {
            let at = start + Duration::seconds(i64::try_from(i).expect("small index"));
            let events = rule.evaluate(&CpuSnapshot::new(at, *usage, 4, Vec::new()));
            (!events.is_empty()).then_some(i)
        })
        .collect();

    // Equal to the threshold counts as crossing.
    assert_eq!(raised, vec![1, 5]);
    assert!(rule.is_active());
}

#[test]
fn cpu_event_describes_reading() {
    let rule = CpuTotalRule::new(80.0);
    let events = rule.evaluate(&CpuSnapshot::new(Utc::now(), 88.5, 8, Vec::new()));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, CPU_TOTAL_HIGH);
    assert!(events[0].related_resource.is_none());
    assert!(events[0].description.contains("88.5%"));
}

#[test]
fn disk_rule_tracks_each_drive_independently() {
    let rule = DiskUsageRule::new(90.0);

    let first = rule.evaluate(&disk_snapshot(vec![drive("C:", 95.0), drive("D:", 40.0)]));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].event_type, DISK_USAGE_HIGH);
    assert_eq!(first[0].related_resource.as_deref(), Some("C:"));

    let second = rule.evaluate(&disk_snapshot(vec![drive("C:", 96.0), drive("D:", 93.0)]));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].related_resource.as_deref(), Some("D:"));

    let message = rule.active_message().expect("two drives in alert");
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Drive C:"));
    assert!(lines[1].starts_with("Drive D:"));
}

#[test]
fn disk_rule_forgets_removed_drive() {
    let rule = DiskUsageRule::new(90.0);
    rule.evaluate(&disk_snapshot(vec![drive("E:", 97.0)]));
    assert!(rule.is_active("E:"));

    rule.evaluate(&disk_snapshot(vec![]));
    assert!(!rule.is_active("E:"));
    assert!(rule.active_message().is_none());

    // Reappearing above the threshold is a new crossing.
    let events = rule.evaluate(&disk_snapshot(vec![drive("E:", 97.0)]));
    assert_eq!(events.len(), 1);
}

#[test]
fn disk_threshold_change_resets_state() {
    let rule = DiskUsageRule::new(90.0);
    rule.evaluate(&disk_snapshot(vec![drive("C:", 95.0)]));

    rule.set_threshold(97.0);
    assert!(!rule.is_active("C:"));
    assert!(rule.evaluate(&disk_snapshot(vec![drive("C:", 95.0)])).is_empty());

    rule.set_threshold(92.0);
    assert_eq!(rule.evaluate(&disk_snapshot(vec![drive("C:", 95.0)])).len(), 1);
}

#[test]
fn trend_reports_window_statistics() {
    let analyzer = CpuTrendAnalyzer::new();
    let now = Utc::now();

    // 14 minutes ago: a quiet period, then a spike in the last minute.
    analyzer.update(10.0, now - Duration::minutes(14));
    analyzer.update(12.0, now - Duration::minutes(10));
    analyzer.update(60.0, now - Duration::seconds(30));
    let trend = analyzer.update(70.0, now);

    assert_eq!(trend.sample_count, 4);
    assert!((trend.average_1m - 65.0).abs() < 1e-9);
    assert!((trend.max - 70.0).abs() < f64::EPSILON);
    assert!((trend.min - 10.0).abs() < f64::EPSILON);
    assert_eq!(trend.stability, Stability::Fluctuating);

    // Sixteen minutes on, nothing is left in the window.
    let later = analyzer.snapshot(now + Duration::minutes(16));
    assert_eq!(later.sample_count, 0);
    assert_eq!(later.stability, Stability::Stable);
}
