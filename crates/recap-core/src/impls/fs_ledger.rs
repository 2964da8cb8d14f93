//! FsDedupLedger - マーカーファイルによる dedup 台帳
//!
//! - キー: ソース参照の SHA-256（先頭 16 桁の hex）
//! - 中身: マークした時刻（RFC 3339）。purge はこの時刻で判定し、
//!   読めなければ mtime にフォールバックする

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::fs_util::{atomic_write, is_tmp_name, modified_at, read_if_exists, remove_if_exists, sorted_file_names};
use crate::domain::SourceRef;
use crate::error::{RecapError, Result};
use crate::ports::{Clock, DedupLedger};

const KEY_LEN: usize = 16;

/// Deterministic dedup key of a source reference.
pub fn dedup_key(source: &SourceRef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_key_input().as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..KEY_LEN].to_string()
}

pub struct FsDedupLedger {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FsDedupLedger {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    fn marker_path(&self, source: &SourceRef) -> PathBuf {
        self.dir.join(dedup_key(source))
    }
}

impl DedupLedger for FsDedupLedger {
    fn has(&self, source: &SourceRef) -> Result<bool> {
        Ok(self.marker_path(source).exists())
    }

    fn mark(&self, source: &SourceRef) -> Result<()> {
        let path = self.marker_path(source);
        if path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|e| RecapError::io(&self.dir, e))?;
        atomic_write(&path, self.clock.now().to_rfc3339().as_bytes())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for name in sorted_file_names(&self.dir)? {
            let path = self.dir.join(&name);

            let marked_at = if is_tmp_name(&name) {
                None
            } else {
                read_if_exists(&path)?
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
                    .map(|at| at.with_timezone(&Utc))
            };
            let marked_at = match marked_at {
                Some(at) => at,
                None => match modified_at(&path) {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(marker = %name, error = %e, "skipping unreadable dedup marker");
                        continue;
                    }
                },
            };

            if marked_at < cutoff && remove_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(sorted_file_names(&self.dir)?
            .iter()
            .filter(|name| !is_tmp_name(name))
            .count())
    }
}
