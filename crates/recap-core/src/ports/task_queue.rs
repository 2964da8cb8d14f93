//! TaskQueue port - 永続化された要約待ちキュー
//!
//! # 設計原則
//! - enqueue は追記のみ（一意な名前で書き込む）。ロック不要で複数プロセスから安全
//! - enqueue 時には dedup を確認しない（check-then-act の競合を drain 側で解消する）
//! - `list_pending` は古い順。デコードできないレコードも `Malformed` として返す
//! - `remove` は冪等

use chrono::{DateTime, Utc};

use crate::domain::{PendingTask, SummaryTask, TaskName};
use crate::error::Result;

pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task: &SummaryTask) -> Result<TaskName>;

    fn list_pending(&self) -> Result<Vec<PendingTask>>;

    fn remove(&self, name: &TaskName) -> Result<()>;

    /// Delete residue enqueued before `cutoff`. Returns the number removed.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn len(&self) -> Result<usize>;
}
