mod common;

use std::fs;
use std::sync::Arc;

use chrono::Duration;

use common::{Harness, Reply, ScriptedSummarizer, TOPIC, at, date};
use recap_core::app::{Gated, MaintenanceReport, MaintenanceSummary, WeeklyMerge};
use recap_core::domain::{SessionId, SourceRef, SummaryTask};
use recap_core::impls::{FsDedupLedger, FsTaskQueue};
use recap_core::ports::{Clock, DedupLedger, TaskQueue, UlidGenerator, WeeklyLocation};

fn harness(now: chrono::DateTime<chrono::Local>) -> Harness {
    Harness::new(now, ScriptedSummarizer::always(Reply::Text(TOPIC)))
}

fn write_daily(h: &Harness, d: chrono::NaiveDate, body: &str) -> String {
    let content = format!("# {d}\n\n---\n\n### ⏰ 10:00  `sess0001`\n\n{body}\n");
    fs::write(h.app.layout.daily_dir.join(format!("{d}.md")), &content).unwrap();
    content
}

fn ran(report: Gated<MaintenanceReport>) -> MaintenanceSummary {
    match report {
        Gated::Ran(MaintenanceReport::Ran(summary)) => summary,
        other => panic!("maintenance did not run: {other:?}"),
    }
}

#[test]
fn non_trigger_day_writes_nothing() {
    // 2026-10-22 は木曜
    let h = harness(at(2026, 10, 22, 9, 0));
    write_daily(&h, date(2026, 10, 13), "last week");

    let report = h.app.coordinator.run_maintenance(false).unwrap();
    assert_eq!(report, Gated::Ran(MaintenanceReport::NotTriggerDay));
    assert!(h.files_in(&h.app.layout.weekly_dir).is_empty());
    assert!(h.daily(date(2026, 10, 13)).is_some());
    assert!(!h.app.layout.root.join(".maintenance-2026-10-22").exists());
}

#[test]
fn weekly_rollup_twice_produces_one_record() {
    let h = harness(at(2026, 10, 19, 9, 0));
    let mon = write_daily(&h, date(2026, 10, 12), "monday");
    let sun = write_daily(&h, date(2026, 10, 18), "sunday");
    let older = write_daily(&h, date(2026, 10, 5), "two weeks ago");

    let first = ran(h.app.coordinator.run_maintenance(false).unwrap());
    assert_eq!(
        first.weekly,
        WeeklyMerge::Written {
            monday: date(2026, 10, 12),
            dailies: 2
        }
    );
    assert_eq!(
        h.app.coordinator.run_maintenance(false).unwrap(),
        Gated::Ran(MaintenanceReport::AlreadyDone)
    );

    // 翌日の手動実行でも同じ週は作り直さない
    h.clock.advance(Duration::days(1));
    let forced = ran(h.app.coordinator.run_maintenance(true).unwrap());
    assert_eq!(forced.weekly, WeeklyMerge::AlreadyExists(WeeklyLocation::Weekly));

    assert_eq!(h.files_in(&h.app.layout.weekly_dir), vec!["week-2026-10-12.md"]);
    let weekly =
        fs::read_to_string(h.app.layout.weekly_dir.join("week-2026-10-12.md")).unwrap();
    assert_eq!(
        weekly,
        format!("# Week 2026-10-12 ~ 2026-10-18\n\n{mon}\n{sun}")
    );
    assert!(h.daily(date(2026, 10, 12)).is_none());
    assert!(h.daily(date(2026, 10, 18)).is_none());
    // 対象週の外は触らない
    assert_eq!(h.daily(date(2026, 10, 5)).as_deref(), Some(older.as_str()));
}

#[test]
fn archived_weekly_lives_in_exactly_one_place() {
    let h = harness(at(2026, 10, 26, 9, 0));
    write_daily(&h, date(2026, 10, 21), "late october");
    ran(h.app.coordinator.run_maintenance(false).unwrap());
    let weekly_path = h.app.layout.weekly_dir.join("week-2026-10-19.md");
    let before = fs::read(&weekly_path).unwrap();

    // 11 月最初の月曜
    h.clock.set(at(2026, 11, 2, 9, 0));
    let summary = ran(h.app.coordinator.run_maintenance(false).unwrap());
    assert_eq!(summary.archive.month.as_deref(), Some("2026-10"));
    assert_eq!(summary.archive.moved, 1);

    let archived = h.app.layout.monthly_dir.join("2026-10").join("week-2026-10-19.md");
    assert_eq!(fs::read(&archived).unwrap(), before);
    assert!(!weekly_path.exists());

    // 前週が 10/19 の週になる日（11/1 日曜）に、畳み込み済み daily の残骸を置いて再実行
    h.clock.set(at(2026, 11, 1, 9, 0));
    write_daily(&h, date(2026, 10, 21), "leftover");
    let again = ran(h.app.coordinator.run_maintenance(true).unwrap());
    assert_eq!(again.archive.moved, 0);
    assert_eq!(
        again.weekly,
        WeeklyMerge::AlreadyExists(WeeklyLocation::Monthly("2026-10".into()))
    );
    assert_eq!(
        h.files_in(&h.app.layout.monthly_dir.join("2026-10")),
        vec!["week-2026-10-19.md"]
    );
    assert!(h.files_in(&h.app.layout.weekly_dir).is_empty());
    assert!(h.daily(date(2026, 10, 21)).is_some());
}

#[test]
fn archive_conflict_is_reported_and_left_alone() {
    let h = harness(at(2026, 11, 2, 9, 0));
    let month = h.app.layout.monthly_dir.join("2026-10");
    fs::create_dir_all(&month).unwrap();
    fs::write(month.join("week-2026-10-12.md"), "archived copy").unwrap();
    fs::write(h.app.layout.weekly_dir.join("week-2026-10-12.md"), "diverged copy").unwrap();

    let summary = ran(h.app.coordinator.run_maintenance(false).unwrap());
    assert_eq!(summary.archive.conflicts, vec![date(2026, 10, 12)]);
    assert_eq!(
        fs::read_to_string(month.join("week-2026-10-12.md")).unwrap(),
        "archived copy"
    );
    assert_eq!(
        fs::read_to_string(h.app.layout.weekly_dir.join("week-2026-10-12.md")).unwrap(),
        "diverged copy"
    );
}

#[test]
fn expired_markers_and_queue_residue_are_purged() {
    let h = harness(at(2026, 10, 5, 9, 0));
    let ledger = FsDedupLedger::new(&h.app.layout.summarized_dir, h.clock.clone());
    let queue = FsTaskQueue::new(
        &h.app.layout.queue_dir,
        Arc::new(UlidGenerator::new(h.clock.clone())),
    );

    let old = SourceRef::new("/t/old.jsonl");
    ledger.mark(&old).unwrap();
    queue
        .enqueue(&SummaryTask::new(
            old.clone(),
            "/w",
            SessionId::new("stale"),
            h.clock.now(),
        ))
        .unwrap();

    // 6 日後: まだ残る
    h.clock.advance(Duration::days(6));
    let recent = SourceRef::new("/t/recent.jsonl");
    ledger.mark(&recent).unwrap();

    // 2026-10-12（月）
    h.clock.advance(Duration::days(1) + Duration::minutes(1));
    let summary = ran(h.app.coordinator.run_maintenance(false).unwrap());
    assert_eq!(summary.purged_markers, 1);
    assert_eq!(summary.purged_tasks, 1);
    assert!(!ledger.has(&old).unwrap());
    assert!(ledger.has(&recent).unwrap());
    assert_eq!(queue.len().unwrap(), 0);
}
