//! DedupLedger port - 「二度と処理しない」の正本
//!
//! ソース参照の決定的ハッシュをキーにした存在のみのマーカー集合。
//! 参照されるタイミング:
//! 1. enqueue 前（解決済みならキューに入れない）
//! 2. 処理前（競合で重複が入った場合のスキップ）
//! 3. 処理後（終端結果すべてでマーク）

use chrono::{DateTime, Utc};

use crate::domain::SourceRef;
use crate::error::Result;

pub trait DedupLedger: Send + Sync {
    fn has(&self, source: &SourceRef) -> Result<bool>;

    /// Idempotent.
    fn mark(&self, source: &SourceRef) -> Result<()>;

    /// Delete markers created before `cutoff`. Returns the number removed.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn len(&self) -> Result<usize>;
}
