//! FileLease - アドバイザリロック（flock）による ExclusiveLease
//!
//! - `try_lock_exclusive` はノンブロッキング
//! - guard の Drop でアンロック
//! - プロセスが死ねば OS がロックを解放する（取り残されない）

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;

use fs2::FileExt;
use tracing::debug;

use crate::error::{RecapError, Result};
use crate::ports::{ExclusiveLease, LeaseGuard};

pub struct FileLease {
    path: PathBuf,
}

impl FileLease {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct FileLeaseGuard {
    file: File,
}

impl LeaseGuard for FileLeaseGuard {}

impl Drop for FileLeaseGuard {
    fn drop(&mut self) {
        // 失敗しても file の close で解放される
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl ExclusiveLease for FileLease {
    fn try_acquire(&self) -> Result<Option<Box<dyn LeaseGuard>>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RecapError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| RecapError::io(&self.path, e))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(lock = %self.path.display(), "lease acquired");
                Ok(Some(Box::new(FileLeaseGuard { file })))
            }
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(RecapError::io(&self.path, e)),
        }
    }

    /// ロックファイルを作らずに調べる。ファイルが無ければ誰も持っていない。
    fn is_held(&self) -> Result<bool> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(RecapError::io(&self.path, e)),
        };

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                Ok(false)
            }
            Err(e) if is_contended(&e) => Ok(true),
            Err(e) => Err(RecapError::io(&self.path, e)),
        }
    }
}
