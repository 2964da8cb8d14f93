//! RollupEngine - day → week → month の畳み込みと掃除
//!
//! # フロー（トリガー日に 1 日 1 回）
//! 1. weekly merge: 先週の daily を連結して weekly を作り、daily を消す。
//!    weekly が既にあれば、その中に含まれる daily の残骸だけ消す
//! 2. cleanup: 古い dedup マーカーとキュー残骸を消す
//! 3. monthly archive: 月初 7 日以内なら先月分の weekly を monthly/ に移す
//! 4. marker: 今日のマーカーを書き、古いマーカーを消す
//!
//! 各ステップは単独で冪等。失敗したステップはログに残し、残りは続行する。

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::domain::record::fold_week;
use crate::domain::{WeekRange, concluded_month, is_trigger_day, month_key};
use crate::error::Result;
use crate::ports::{ArchiveMove, Clock, DedupLedger, RecordStore, TaskQueue, WeeklyLocation};

/// Outcome of `RollupEngine::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceReport {
    /// Not the trigger weekday and not forced. The day's marker is untouched.
    NotTriggerDay,
    /// Today's marker already exists.
    AlreadyDone,
    Ran(MaintenanceSummary),
    /// Could not even check today's marker.
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeeklyMerge {
    Written { monday: NaiveDate, dailies: usize },
    AlreadyExists(WeeklyLocation),
    NoDailies,
    /// The step failed; see the log.
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub month: Option<String>,
    pub moved: usize,
    pub already_archived: usize,
    /// Mondays whose archived copy differs from the weekly one.
    pub conflicts: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSummary {
    pub weekly: WeeklyMerge,
    pub purged_markers: usize,
    pub purged_tasks: usize,
    pub archive: ArchiveSummary,
    pub pruned_maintenance_markers: usize,
    /// Names of the steps that failed.
    pub failed_steps: Vec<&'static str>,
}

pub struct RollupEngine {
    records: Arc<dyn RecordStore>,
    ledger: Arc<dyn DedupLedger>,
    queue: Arc<dyn TaskQueue>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl RollupEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        ledger: Arc<dyn DedupLedger>,
        queue: Arc<dyn TaskQueue>,
        clock: Arc<dyn Clock>,
        retention_days: i64,
    ) -> Self {
        Self {
            records,
            ledger,
            queue,
            clock,
            retention: Duration::days(retention_days),
        }
    }

    /// Run maintenance once for today. `force` skips the trigger-day check.
    pub fn run(&self, force: bool) -> Result<MaintenanceReport> {
        let today = self.clock.today();

        if !force && !is_trigger_day(today) {
            return Ok(MaintenanceReport::NotTriggerDay);
        }
        if self.records.has_maintenance_marker(today)? {
            info!(%today, "maintenance already done today");
            return Ok(MaintenanceReport::AlreadyDone);
        }

        info!(%today, force, "maintenance started");
        let mut failed_steps = Vec::new();

        let weekly = match self.merge_weekly(today) {
            Ok(merge) => merge,
            Err(e) => {
                warn!(error = %e, "weekly merge failed");
                failed_steps.push("weekly_merge");
                WeeklyMerge::Failed
            }
        };

        let (purged_markers, purged_tasks) = match self.cleanup() {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "ledger cleanup failed");
                failed_steps.push("cleanup");
                (0, 0)
            }
        };

        let archive = match self.archive_monthly(today) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "monthly archive failed");
                failed_steps.push("monthly_archive");
                ArchiveSummary::default()
            }
        };

        let pruned_maintenance_markers = match self.housekeep_markers(today) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "maintenance marker housekeeping failed");
                failed_steps.push("markers");
                0
            }
        };

        info!(failed = failed_steps.len(), "maintenance finished");
        Ok(MaintenanceReport::Ran(MaintenanceSummary {
            weekly,
            purged_markers,
            purged_tasks,
            archive,
            pruned_maintenance_markers,
            failed_steps,
        }))
    }

    fn merge_weekly(&self, today: NaiveDate) -> Result<WeeklyMerge> {
        let week = WeekRange::previous(today);
        let in_range: Vec<NaiveDate> = self
            .records
            .daily_dates()?
            .into_iter()
            .filter(|date| week.contains(*date))
            .collect();

        if let Some(location) = self.records.find_weekly(week.monday)? {
            if !in_range.is_empty() {
                self.reconcile_leftovers(&week, &location, &in_range)?;
            }
            return Ok(WeeklyMerge::AlreadyExists(location));
        }

        if in_range.is_empty() {
            return Ok(WeeklyMerge::NoDailies);
        }

        let mut contents = Vec::with_capacity(in_range.len());
        for date in &in_range {
            if let Some(content) = self.records.read_daily(*date)? {
                contents.push(content);
            }
        }

        self.records
            .write_weekly(week.monday, &fold_week(&week, &contents))?;
        for date in &in_range {
            self.records.remove_daily(*date)?;
        }

        info!(monday = %week.monday, dailies = in_range.len(), "weekly record written");
        Ok(WeeklyMerge::Written {
            monday: week.monday,
            dailies: in_range.len(),
        })
    }

    /// weekly 書き込み後・daily 削除前に落ちた場合の残骸。
    /// weekly に丸ごと含まれている daily だけ消し、それ以外は残す。
    fn reconcile_leftovers(
        &self,
        week: &WeekRange,
        location: &WeeklyLocation,
        leftovers: &[NaiveDate],
    ) -> Result<()> {
        let weekly = match location {
            WeeklyLocation::Weekly => self.records.read_weekly(week.monday)?,
            WeeklyLocation::Monthly(month) => self.records.read_archived(month, week.monday)?,
        }
        .unwrap_or_default();

        for date in leftovers {
            let Some(content) = self.records.read_daily(*date)? else {
                continue;
            };
            if !content.is_empty() && weekly.contains(&content) {
                self.records.remove_daily(*date)?;
                info!(%date, monday = %week.monday, "removed daily already folded into weekly");
            } else {
                warn!(
                    %date,
                    monday = %week.monday,
                    "weekly record exists but this daily is not part of it; leaving it"
                );
            }
        }
        Ok(())
    }

    fn cleanup(&self) -> Result<(usize, usize)> {
        let cutoff = (self.clock.now() - self.retention).with_timezone(&Utc);
        let markers = self.ledger.purge_older_than(cutoff)?;
        let tasks = self.queue.purge_older_than(cutoff)?;
        if markers + tasks > 0 {
            info!(markers, tasks, "purged expired ledger entries");
        }
        Ok((markers, tasks))
    }

    fn archive_monthly(&self, today: NaiveDate) -> Result<ArchiveSummary> {
        let Some((year, month)) = concluded_month(today) else {
            return Ok(ArchiveSummary::default());
        };
        let key = month_key(year, month);
        let mut summary = ArchiveSummary {
            month: Some(key.clone()),
            ..Default::default()
        };

        for monday in self.records.weekly_mondays()? {
            if monday.year() != year || monday.month() != month {
                continue;
            }
            match self.records.archive_weekly(monday, &key)? {
                ArchiveMove::Moved => summary.moved += 1,
                ArchiveMove::AlreadyArchived => summary.already_archived += 1,
                ArchiveMove::Conflict => {
                    warn!(%monday, month = %key, "archived weekly differs; left in place");
                    summary.conflicts.push(monday);
                }
            }
        }

        if summary.moved > 0 {
            info!(month = %key, moved = summary.moved, "weekly records archived");
        }
        Ok(summary)
    }

    fn housekeep_markers(&self, today: NaiveDate) -> Result<usize> {
        self.records.write_maintenance_marker(today)?;

        let cutoff = today - self.retention;
        let mut pruned = 0;
        for date in self.records.maintenance_markers()? {
            if date < cutoff {
                self.records.remove_maintenance_marker(date)?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}
