//! AppBuilder - Config から App を組み立てる
//!
//! # 使用例
//! ```ignore
//! let app = AppBuilder::new(Config::load_from(Config::default_path())?).build()?;
//! app.on_session_start(session, &cwd).await?;
//! ```
//!
//! 既定ではファイルシステム実装と `claude` CLI を使う。テストでは
//! `with_clock` / `with_summarizer` / `with_lease` で差し替える。
//! 読むだけのコマンドは `read_only()` でディレクトリ作成を省く。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::coordinator::{Coordinator, DrainSettings, Ports, TriggerReport};
use super::inspect::Inspector;
use super::rollup::RollupEngine;
use crate::config::{Config, StoreLayout};
use crate::domain::SessionId;
use crate::error::Result;
use crate::impls::{
    FileLease, FsDedupLedger, FsRecordStore, FsTaskQueue, JsonlTranscriptReader,
    ProcessSummarizer, TranscriptLocator,
};
use crate::ports::{
    Clock, ExclusiveLease, IdGenerator, SourceReader, Summarizer, SystemClock, UlidGenerator,
};

pub struct AppBuilder {
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    source: Option<Arc<dyn SourceReader>>,
    lease: Option<Arc<dyn ExclusiveLease>>,
    read_only: bool,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: None,
            summarizer: None,
            source: None,
            lease: None,
            read_only: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_source_reader(mut self, source: Arc<dyn SourceReader>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_lease(mut self, lease: Arc<dyn ExclusiveLease>) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Do not create the storage layout. Missing directories read as empty.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Create the storage layout (unless read-only) and wire every component.
    pub fn build(self) -> Result<App> {
        let config = self.config;
        let layout = config.layout();
        if !self.read_only {
            layout.ensure()?;
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let summarizer = self.summarizer.unwrap_or_else(|| {
            Arc::new(ProcessSummarizer::new(
                config.summarizer_command.clone(),
                config.model.clone(),
            ))
        });
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(JsonlTranscriptReader::new()));
        let lease = self
            .lease
            .unwrap_or_else(|| Arc::new(FileLease::new(&layout.lock_file)));

        let ports = Ports {
            queue: Arc::new(FsTaskQueue::new(&layout.queue_dir, ids.clone())),
            ledger: Arc::new(FsDedupLedger::new(&layout.summarized_dir, clock.clone())),
            lease,
            records: Arc::new(FsRecordStore::new(layout.clone())),
            source,
            summarizer,
            clock,
            ids,
        };

        let rollup = RollupEngine::new(
            ports.records.clone(),
            ports.ledger.clone(),
            ports.queue.clone(),
            ports.clock.clone(),
            config.retention_days,
        );
        let inspector = Inspector::new(
            layout.clone(),
            config.model.clone(),
            ports.records.clone(),
            ports.queue.clone(),
            ports.ledger.clone(),
            ports.lease.clone(),
            ports.clock.clone(),
        );
        let settings = DrainSettings {
            min_messages: config.min_messages,
            max_chars: config.max_chars,
            summarizer_timeout: Duration::from_secs(config.summarizer_timeout_secs),
        };

        Ok(App {
            locator: TranscriptLocator::new(&config.transcripts_dir),
            coordinator: Coordinator::new(ports, settings, rollup),
            inspector,
            layout,
            config,
        })
    }
}

/// What happened when a new session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No earlier transcript for this working directory.
    NoTranscript,
    Triggered(TriggerReport),
}

pub struct App {
    pub config: Config,
    pub layout: StoreLayout,
    pub coordinator: Coordinator,
    pub inspector: Inspector,
    pub locator: TranscriptLocator,
}

impl App {
    /// Summarize the previous session of `cwd`, if there is one.
    pub async fn on_session_start(&self, session: SessionId, cwd: &Path) -> Result<HookOutcome> {
        let Some(source) = self.locator.previous_transcript(&session, cwd) else {
            info!(cwd = %cwd.display(), "no previous transcript found");
            return Ok(HookOutcome::NoTranscript);
        };
        let report = self.coordinator.trigger(source, cwd, session).await?;
        Ok(HookOutcome::Triggered(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ShowTarget;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            root: dir.path().join("store"),
            transcripts_dir: dir.path().join("projects"),
            ..Config::default()
        }
    }

    #[test]
    fn build_creates_the_layout() {
        let dir = TempDir::new().unwrap();
        let app = AppBuilder::new(config_in(&dir)).build().unwrap();
        assert!(app.layout.queue_dir.is_dir());
        assert!(app.layout.daily_dir.is_dir());
        assert_eq!(app.inspector.status().unwrap().queued, 0);
    }

    #[test]
    fn read_only_build_leaves_a_missing_store_alone() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let root = config.root.clone();
        let app = AppBuilder::new(config).read_only().build().unwrap();

        assert!(app.inspector.show(ShowTarget::All).unwrap().is_empty());
        assert!(app.inspector.list().unwrap().is_empty());
        assert!(app.inspector.search("anything").unwrap().is_empty());
        let status = app.inspector.status().unwrap();
        assert_eq!(status.queued, 0);
        assert!(!status.gate_held);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn hook_without_transcripts_does_nothing() {
        let dir = TempDir::new().unwrap();
        let app = AppBuilder::new(config_in(&dir)).build().unwrap();
        let outcome = app
            .on_session_start(SessionId::new("s1"), Path::new("/work/app"))
            .await
            .unwrap();
        assert_eq!(outcome, HookOutcome::NoTranscript);
        assert_eq!(app.inspector.status().unwrap().queued, 0);
    }
}
