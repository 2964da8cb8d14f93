//! ProcessSummarizer - 外部 CLI（`claude -p`）を子プロセスとして呼ぶ Summarizer
//!
//! `<program> -p --model <model> <PROMPT><conversation>` を実行し、stdout を要約とする。
//! `kill_on_drop(true)` なので、呼び出し側の timeout で future が drop されると
//! 子プロセスも止まる。

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::Summary;
use crate::error::SummarizerError;
use crate::ports::Summarizer;

pub const SUMMARY_PROMPT: &str = "\
You are an assistant that distills engineering experience. Analyse the work session transcript below and extract what is worth remembering.

Rules:
1. Only record reusable technical experience; ignore small talk and trivial Q&A.
2. If the session has nothing worth recording, reply with the single word SKIP.
3. Be concise.

Format:
## 📋 Topic
[one sentence]

## 🎯 Problems solved
[short list]

## 💡 Key lessons
[concrete, reusable lessons]

## 🔧 Useful code / commands
[snippets worth keeping, if any]

## ⚠️ Pitfalls
[if any]

Transcript:
";

const STDERR_LIMIT: usize = 500;

pub struct ProcessSummarizer {
    program: String,
    model: String,
}

impl ProcessSummarizer {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Summarizer for ProcessSummarizer {
    async fn summarize(&self, conversation: &str) -> Result<Summary, SummarizerError> {
        let prompt = format!("{SUMMARY_PROMPT}{conversation}");
        debug!(program = %self.program, model = %self.model, chars = prompt.len(), "invoking summarizer");

        let output = Command::new(&self.program)
            .arg("-p")
            .arg("--model")
            .arg(&self.model)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SummarizerError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SummarizerError::ExitStatus {
                code: output.status.code(),
                stderr: stderr.trim().chars().take(STDERR_LIMIT).collect(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(SummarizerError::EmptyOutput);
        }
        Ok(Summary::from_output(&stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdout_becomes_the_summary() {
        let summarizer = ProcessSummarizer::new("echo", "test-model");
        let summary = summarizer.summarize("User: hi").await.unwrap();
        match summary {
            Summary::Text(text) => {
                assert!(text.starts_with("-p --model test-model"));
                assert!(text.ends_with("User: hi"));
            }
            Summary::Skip => panic!("echo output is not SKIP"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let summarizer = ProcessSummarizer::new("recap-no-such-program-xyz", "m");
        assert!(matches!(
            summarizer.summarize("x").await,
            Err(SummarizerError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let summarizer = ProcessSummarizer::new("false", "m");
        assert!(matches!(
            summarizer.summarize("x").await,
            Err(SummarizerError::ExitStatus { .. })
        ));
    }

    #[tokio::test]
    async fn silent_success_is_empty_output() {
        let summarizer = ProcessSummarizer::new("true", "m");
        assert!(matches!(
            summarizer.summarize("x").await,
            Err(SummarizerError::EmptyOutput)
        ));
    }
}
