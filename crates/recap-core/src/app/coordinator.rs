//! Coordinator - enqueue → gate → drain → rollup → release
//!
//! # フロー
//! 1. 候補ソースが解決済みでなければ enqueue（ロック不要）
//! 2. ExclusiveLease をノンブロッキングで取る。取れなければ何もせず終わる
//! 3. キューが空になるまで古い順に 1 件ずつ処理し、結果に関係なく削除する
//! 4. RollupEngine を実行
//! 5. guard の drop でリース解放
//!
//! # 処理順（1 タスク）
//! missing → resolved → threshold → projection → summarizer（timeout 付き）
//!
//! dedup マークは action の後。落ちた場合は重複があり得るが欠落はしない。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span, warn};

use super::rollup::{MaintenanceReport, RollupEngine};
use crate::domain::{
    CycleId, DailyEntry, PendingTask, SessionId, SourceRef, Summary, SummaryTask, TaskName,
    TaskOutcome,
};
use crate::error::{Result, SummarizerError};
use crate::ports::{
    Clock, DedupLedger, ExclusiveLease, IdGenerator, RecordStore, SourceReader, Summarizer,
    TaskQueue,
};

/// Result of an operation that needs the exclusion gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<T> {
    /// Another process holds the gate. Nothing was changed.
    Contended,
    Ran(T),
}

impl<T> Gated<T> {
    pub fn ran(self) -> Option<T> {
        match self {
            Gated::Ran(value) => Some(value),
            Gated::Contended => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// One entry per processed task, in processing order.
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks whose processing hit an internal error. Not marked.
    pub errors: usize,
    /// Undecodable task records that were discarded.
    pub malformed: usize,
    /// The loop stopped early instead of emptying the queue.
    pub halted: bool,
}

impl DrainReport {
    pub fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: CycleId,
    pub drain: DrainReport,
    pub maintenance: MaintenanceReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReport {
    /// `None` when the source was already resolved and nothing was queued.
    pub enqueued: Option<TaskName>,
    pub cycle: Gated<CycleReport>,
}

/// Tunables taken from `Config`.
#[derive(Debug, Clone)]
pub struct DrainSettings {
    pub min_messages: usize,
    pub max_chars: usize,
    pub summarizer_timeout: Duration,
}

/// Every port the coordinator talks to.
#[derive(Clone)]
pub struct Ports {
    pub queue: Arc<dyn TaskQueue>,
    pub ledger: Arc<dyn DedupLedger>,
    pub lease: Arc<dyn ExclusiveLease>,
    pub records: Arc<dyn RecordStore>,
    pub source: Arc<dyn SourceReader>,
    pub summarizer: Arc<dyn Summarizer>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

pub struct Coordinator {
    ports: Ports,
    settings: DrainSettings,
    rollup: RollupEngine,
}

impl Coordinator {
    pub fn new(ports: Ports, settings: DrainSettings, rollup: RollupEngine) -> Self {
        Self {
            ports,
            settings,
            rollup,
        }
    }

    /// Queue `source` unless already resolved, then try to run a cycle.
    pub async fn trigger(
        &self,
        source: SourceRef,
        context: &Path,
        session: SessionId,
    ) -> Result<TriggerReport> {
        let enqueued = if self.ports.ledger.has(&source)? {
            info!(source = %source, "source already resolved; not queued");
            None
        } else {
            let task = SummaryTask::new(source, context, session, self.ports.clock.now());
            let name = self.ports.queue.enqueue(&task)?;
            info!(task = %name, source = %task.source, "task enqueued");
            Some(name)
        };

        let cycle = self.run_cycle().await?;
        Ok(TriggerReport { enqueued, cycle })
    }

    /// Drain the queue and run maintenance while holding the gate.
    pub async fn run_cycle(&self) -> Result<Gated<CycleReport>> {
        let Some(_guard) = self.ports.lease.try_acquire()? else {
            info!("gate held by another process; leaving the queue to it");
            return Ok(Gated::Contended);
        };

        let cycle = self.ports.ids.generate_cycle_id();
        let span = info_span!("cycle", id = %cycle);
        let report = async {
            let drain = self.drain().await;
            info!(
                processed = drain.outcomes.len(),
                summarized = drain.count(|o| *o == TaskOutcome::Summarized),
                failed = drain.count(TaskOutcome::is_failure),
                malformed = drain.malformed,
                errors = drain.errors,
                halted = drain.halted,
                "drain finished"
            );
            let maintenance = self.maintain();
            CycleReport {
                cycle,
                drain,
                maintenance,
            }
        }
        .instrument(span)
        .await;
        Ok(Gated::Ran(report))
    }

    /// Maintenance only, under the gate. `force` skips the trigger-day check.
    pub fn run_maintenance(&self, force: bool) -> Result<Gated<MaintenanceReport>> {
        let Some(_guard) = self.ports.lease.try_acquire()? else {
            info!("gate held by another process; maintenance skipped");
            return Ok(Gated::Contended);
        };
        Ok(Gated::Ran(self.rollup.run(force)?))
    }

    fn maintain(&self) -> MaintenanceReport {
        self.rollup.run(false).unwrap_or_else(|e| {
            error!(error = %e, "maintenance aborted");
            MaintenanceReport::Aborted {
                reason: e.to_string(),
            }
        })
    }

    async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut last_removed: Option<TaskName> = None;

        loop {
            let pending = match self.ports.queue.list_pending() {
                Ok(pending) => pending,
                Err(e) => {
                    error!(error = %e, "cannot list pending tasks; stopping drain");
                    report.halted = true;
                    break;
                }
            };
            let Some(next) = pending.into_iter().next() else {
                break;
            };

            let name = next.name().clone();
            if last_removed.as_ref() == Some(&name) {
                error!(task = %name, "task reappeared after removal; stopping drain");
                report.halted = true;
                break;
            }

            match next {
                PendingTask::Malformed { reason, .. } => {
                    warn!(task = %name, %reason, "discarding malformed task");
                    report.malformed += 1;
                }
                PendingTask::Ready { task, .. } => match self.process_task(&task).await {
                    Ok(outcome) => {
                        if outcome.is_failure() {
                            warn!(task = %name, source = %task.source, ?outcome, "task failed; source stays eligible");
                        } else {
                            info!(task = %name, source = %task.source, ?outcome, "task processed");
                        }
                        report.outcomes.push(outcome);
                    }
                    Err(e) => {
                        error!(task = %name, source = %task.source, error = %e, "task processing error");
                        report.errors += 1;
                    }
                },
            }

            if let Err(e) = self.ports.queue.remove(&name) {
                error!(task = %name, error = %e, "cannot remove task; stopping drain");
                report.halted = true;
                break;
            }
            last_removed = Some(name);
        }

        report
    }

    /// Process one task and record terminal outcomes in the dedup ledger.
    pub async fn process_task(&self, task: &SummaryTask) -> Result<TaskOutcome> {
        let outcome = self.evaluate(task).await?;
        if outcome.marks_resolved() {
            self.ports.ledger.mark(&task.source)?;
        }
        Ok(outcome)
    }

    async fn evaluate(&self, task: &SummaryTask) -> Result<TaskOutcome> {
        let source = &task.source;

        if !self.ports.source.exists(source) {
            return Ok(TaskOutcome::SourceMissing);
        }
        if self.ports.ledger.has(source)? {
            return Ok(TaskOutcome::AlreadyResolved);
        }

        let count = self.ports.source.count_qualifying(source)?;
        if count < self.settings.min_messages {
            return Ok(TaskOutcome::BelowThreshold {
                count,
                min: self.settings.min_messages,
            });
        }

        let conversation = self.ports.source.project(source, self.settings.max_chars)?;
        if conversation.trim().is_empty() {
            return Ok(TaskOutcome::EmptyProjection);
        }

        debug!(source = %source, chars = conversation.len(), "summarizing");
        let limit = self.settings.summarizer_timeout;
        let summary =
            match tokio::time::timeout(limit, self.ports.summarizer.summarize(&conversation)).await
            {
                Ok(Ok(summary)) => summary,
                Ok(Err(e)) => return Ok(failed(e)),
                Err(_) => return Ok(failed(SummarizerError::Timeout(limit))),
            };

        match summary {
            Summary::Skip => Ok(TaskOutcome::Skipped),
            Summary::Text(text) => {
                let now = self.ports.clock.now();
                let entry = DailyEntry {
                    time: now.time(),
                    session_short: task.session_id.short(),
                    text,
                };
                self.ports
                    .records
                    .append_daily(now.date_naive(), &entry.render())?;
                Ok(TaskOutcome::Summarized)
            }
        }
    }
}

fn failed(err: SummarizerError) -> TaskOutcome {
    TaskOutcome::SummarizerFailed {
        reason: err.to_string(),
    }
}
