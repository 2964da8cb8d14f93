//! FsTaskQueue - ディレクトリ 1 つをキューとして使う実装
//!
//! # 実装詳細
//! - 1 タスク = 1 JSON ファイル `<ULID>-<session8>.json`
//! - 書き込みは一時ファイル + rename（部分的なファイルは見えない）
//! - ファイル名の辞書順 = enqueue 順（ULID の性質）

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::fs_util::{atomic_write, is_tmp_name, modified_at, remove_if_exists, sorted_file_names};
use crate::domain::{PendingTask, SummaryTask, TaskName};
use crate::error::{RecapError, Result};
use crate::ports::{IdGenerator, TaskQueue};

const TASK_EXT: &str = ".json";

pub struct FsTaskQueue {
    dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl FsTaskQueue {
    pub fn new(dir: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            dir: dir.into(),
            ids,
        }
    }

    fn path_for(&self, name: &TaskName) -> PathBuf {
        self.dir.join(format!("{name}{TASK_EXT}"))
    }

    fn load(&self, path: &Path) -> std::result::Result<SummaryTask, String> {
        let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }
}

impl TaskQueue for FsTaskQueue {
    fn enqueue(&self, task: &SummaryTask) -> Result<TaskName> {
        fs::create_dir_all(&self.dir).map_err(|e| RecapError::io(&self.dir, e))?;

        let name = TaskName::new(self.ids.generate_task_id(), &task.session_id);
        let body = serde_json::to_vec(task)?;
        atomic_write(&self.path_for(&name), &body)?;

        debug!(task = %name, source = %task.source, "task written");
        Ok(name)
    }

    fn list_pending(&self) -> Result<Vec<PendingTask>> {
        let mut pending = Vec::new();
        for file_name in sorted_file_names(&self.dir)? {
            let Some(stem) = file_name.strip_suffix(TASK_EXT) else {
                continue;
            };
            let name = TaskName::from(stem.to_string());
            let path = self.dir.join(&file_name);
            match self.load(&path) {
                Ok(task) => pending.push(PendingTask::Ready { name, task }),
                Err(reason) => pending.push(PendingTask::Malformed { name, reason }),
            }
        }
        Ok(pending)
    }

    fn remove(&self, name: &TaskName) -> Result<()> {
        remove_if_exists(&self.path_for(name))?;
        Ok(())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for file_name in sorted_file_names(&self.dir)? {
            let path = self.dir.join(&file_name);
            let stem = file_name.strip_suffix(TASK_EXT).unwrap_or(&file_name);

            // 名前に時刻が埋まっていればそれを、なければ mtime を使う
            let age = match TaskName::from(stem.to_string()).enqueued_at() {
                Some(at) if !is_tmp_name(&file_name) => at,
                _ => match modified_at(&path) {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable queue entry");
                        continue;
                    }
                },
            };

            if age < cutoff && remove_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(sorted_file_names(&self.dir)?
            .iter()
            .filter(|name| name.ends_with(TASK_EXT))
            .count())
    }
}
