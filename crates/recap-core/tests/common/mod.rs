#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tempfile::TempDir;

use recap_core::app::{App, AppBuilder};
use recap_core::config::Config;
use recap_core::domain::{SourceRef, Summary};
use recap_core::error::SummarizerError;
use recap_core::ports::{FixedClock, Summarizer};

pub const TOPIC: &str = "## Topic\n...";

#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Skip,
    Fail,
    Hang,
}

/// Answers from a script; once the script runs out, `fallback` repeats.
pub struct ScriptedSummarizer {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn always(reply: Reply) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, conversation: &str) -> Result<Summary, SummarizerError> {
        self.calls.lock().unwrap().push(conversation.to_string());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(Summary::from_output(text)),
            Reply::Skip => Ok(Summary::Skip),
            Reply::Fail => Err(SummarizerError::ExitStatus {
                code: Some(1),
                stderr: "scripted failure".into(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Summary::Skip)
            }
        }
    }
}

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub const PROJECT_CWD: &str = "/work/app";

pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<FixedClock>,
    pub summarizer: Arc<ScriptedSummarizer>,
    pub app: App,
}

impl Harness {
    pub fn new(now: DateTime<Local>, summarizer: ScriptedSummarizer) -> Self {
        Self::with_config(now, summarizer, |_| {})
    }

    pub fn with_config(
        now: DateTime<Local>,
        summarizer: ScriptedSummarizer,
        tweak: impl FnOnce(&mut Config),
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            root: dir.path().join("store"),
            transcripts_dir: dir.path().join("projects"),
            ..Config::default()
        };
        tweak(&mut config);

        let clock = Arc::new(FixedClock::new(now));
        let summarizer = Arc::new(summarizer);
        let app = AppBuilder::new(config)
            .with_clock(clock.clone())
            .with_summarizer(summarizer.clone())
            .build()
            .unwrap();

        Self {
            dir,
            clock,
            summarizer,
            app,
        }
    }

    pub fn project_dir(&self) -> PathBuf {
        self.dir.path().join("projects").join("-work-app")
    }

    /// A transcript with `users` user turns, each answered by the assistant.
    pub fn write_transcript(&self, name: &str, users: usize) -> SourceRef {
        let dir = self.project_dir();
        fs::create_dir_all(&dir).unwrap();
        let mut lines = Vec::new();
        for i in 0..users {
            lines.push(format!(
                r#"{{"type":"user","message":{{"content":"question {i} about {name}"}}}}"#
            ));
            lines.push(format!(
                r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"answer {i}"}}]}}}}"#
            ));
        }
        let path = dir.join(format!("{name}.jsonl"));
        fs::write(&path, lines.join("\n")).unwrap();
        SourceRef::new(path)
    }

    pub fn cwd(&self) -> &Path {
        Path::new(PROJECT_CWD)
    }

    pub fn daily(&self, date: NaiveDate) -> Option<String> {
        fs::read_to_string(self.app.layout.daily_dir.join(format!("{date}.md"))).ok()
    }

    pub fn files_in(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
