use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{SessionId, TaskName};

/// Reference to a source record (a session transcript on disk).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(PathBuf);

impl SourceRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Stable string form; the dedup key is derived from it.
    pub fn as_key_input(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// 1 件の要約タスク（キューに JSON で永続化される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTask {
    pub source: SourceRef,
    /// Working directory of the session that triggered the enqueue.
    pub context: PathBuf,
    pub session_id: SessionId,
    pub enqueued_at: DateTime<Local>,
}

impl SummaryTask {
    pub fn new(
        source: SourceRef,
        context: impl Into<PathBuf>,
        session_id: SessionId,
        enqueued_at: DateTime<Local>,
    ) -> Self {
        Self {
            source,
            context: context.into(),
            session_id,
            enqueued_at,
        }
    }
}

/// `list_pending` の 1 要素
///
/// デコードできないレコードも返す（drain ループが捨てられるように）。
#[derive(Debug, Clone)]
pub enum PendingTask {
    Ready { name: TaskName, task: SummaryTask },
    Malformed { name: TaskName, reason: String },
}

impl PendingTask {
    pub fn name(&self) -> &TaskName {
        match self {
            PendingTask::Ready { name, .. } | PendingTask::Malformed { name, .. } => name,
        }
    }
}
