//! Config - 設定の読み込みとストレージレイアウト
//!
//! 読み込み順:
//! 1. `Config::default()`（ドキュメント化されたフォールバック値）
//! 2. TOML ファイル（存在すれば）
//! 3. 環境変数 `RECAP_DIR` / `RECAP_MIN_MESSAGES` / `RECAP_MODEL`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecapError, Result};

pub const ENV_ROOT: &str = "RECAP_DIR";
pub const ENV_MIN_MESSAGES: &str = "RECAP_MIN_MESSAGES";
pub const ENV_MODEL: &str = "RECAP_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage root. Every persisted file lives below it.
    pub root: PathBuf,
    /// Sessions with fewer user messages than this are never summarized.
    pub min_messages: usize,
    /// Model identifier passed to the summarizer.
    pub model: String,
    /// Program invoked as `<command> -p --model <model> <prompt>`.
    pub summarizer_command: String,
    pub summarizer_timeout_secs: u64,
    /// Upper bound on the transcript projection handed to the summarizer.
    pub max_chars: usize,
    /// Directory holding per-project transcript folders.
    pub transcripts_dir: PathBuf,
    /// Age after which dedup markers, queue residue and maintenance markers are pruned.
    pub retention_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            root: home.join(".recap"),
            min_messages: 4,
            model: "claude-sonnet-4-6".to_string(),
            summarizer_command: "claude".to_string(),
            summarizer_timeout_secs: 120,
            max_chars: 20_000,
            transcripts_dir: home.join(".claude").join("projects"),
            retention_days: 7,
        }
    }
}

impl Config {
    /// Default config file location: `~/.recap/config.toml`.
    pub fn default_path() -> PathBuf {
        home_dir().join(".recap").join("config.toml")
    }

    /// Load from `path` (missing file → defaults), then apply env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// `load_from` with the environment replaced by `lookup`.
    pub fn load_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path.as_ref()) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env_with(lookup)?;
        Ok(config)
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_ROOT)
            && !value.is_empty()
        {
            self.root = PathBuf::from(value);
        }

        if let Some(value) = lookup(ENV_MIN_MESSAGES)
            && !value.is_empty()
        {
            self.min_messages = value.trim().parse().map_err(|_| RecapError::InvalidConfig {
                key: ENV_MIN_MESSAGES,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ENV_MODEL)
            && !value.is_empty()
        {
            self.model = value;
        }

        Ok(())
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.root)
    }
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// StoreLayout はストレージルート配下の全パスを導出する
///
/// ```text
/// <root>/
///   queue/                 pending tasks
///   daily/YYYY-MM-DD.md
///   weekly/week-YYYY-MM-DD.md
///   monthly/YYYY-MM/week-YYYY-MM-DD.md
///   .summarized/           dedup markers
///   .lock                  exclusion gate
///   .maintenance-YYYY-MM-DD
///   recap.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub root: PathBuf,
    pub queue_dir: PathBuf,
    pub daily_dir: PathBuf,
    pub weekly_dir: PathBuf,
    pub monthly_dir: PathBuf,
    pub summarized_dir: PathBuf,
    pub lock_file: PathBuf,
    pub log_file: PathBuf,
}

impl StoreLayout {
    pub const LOG_FILE_NAME: &'static str = "recap.log";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            queue_dir: root.join("queue"),
            daily_dir: root.join("daily"),
            weekly_dir: root.join("weekly"),
            monthly_dir: root.join("monthly"),
            summarized_dir: root.join(".summarized"),
            lock_file: root.join(".lock"),
            log_file: root.join(Self::LOG_FILE_NAME),
            root,
        }
    }

    /// Create every directory of the layout. Safe to call on each start.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            &self.root,
            &self.queue_dir,
            &self.daily_dir,
            &self.weekly_dir,
            &self.monthly_dir,
            &self.summarized_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| RecapError::io(dir, e))?;
        }
        Ok(())
    }
}
