//! JSONL トランスクリプトの読み取りと探索
//!
//! # フォーマット
//! 1 行 1 エントリ:
//! - `{"type":"user"|"assistant","message":{"content": <string | [block]>}}`
//! - `{"type":"summary","summary":"..."}`
//!
//! テキストとして扱うのは `{"type":"text","text":...}` ブロックのみ
//! （tool_use / tool_result は捨てる）。壊れた行（UTF-8 でない・JSON でない）は
//! その行だけスキップする。`type == "user"` の行は message の形に関係なく数える。

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{SessionId, SourceRef};
use crate::error::{RecapError, Result};
use crate::ports::SourceReader;

const PER_TEXT_LIMIT: usize = 600;
const TEXT_TRUNCATED: &str = "...[truncated]";
const CONVERSATION_TRUNCATED: &str = "...[conversation truncated]";
const TRANSCRIPT_EXT: &str = "jsonl";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    #[serde(rename = "type")]
    kind: String,
    message: Option<Value>,
    summary: Option<Value>,
}

impl Entry {
    /// `message.content` のテキスト部分。形が想定外なら空。
    fn texts(&self) -> Vec<&str> {
        match self.message.as_ref().and_then(|m| m.get("content")) {
            Some(Value::String(text)) => vec![text.as_str()],
            Some(Value::Array(blocks)) => blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .filter(|t| !t.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn summary(&self) -> Option<&str> {
        self.summary
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{TEXT_TRUNCATED}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Reads `*.jsonl` session transcripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlTranscriptReader;

impl JsonlTranscriptReader {
    pub fn new() -> Self {
        Self
    }

    fn entries(&self, source: &SourceRef) -> Result<impl Iterator<Item = Entry>> {
        let path = source.path();
        let file = File::open(path).map_err(|e| RecapError::io(path, e))?;
        let path = path.to_path_buf();
        // 行単位で decode する。UTF-8 でも JSON でもない行はその行だけ捨てる
        Ok(BufReader::new(file)
            .split(b'\n')
            .map_while(move |raw| {
                raw.map_err(|e| warn!(path = %path.display(), error = %e, "transcript read failed"))
                    .ok()
            })
            .filter_map(|raw| String::from_utf8(raw).ok())
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<Entry>(&line).ok()))
    }
}

impl SourceReader for JsonlTranscriptReader {
    fn exists(&self, source: &SourceRef) -> bool {
        source.path().is_file()
    }

    fn count_qualifying(&self, source: &SourceRef) -> Result<usize> {
        Ok(self.entries(source)?.filter(|e| e.kind == "user").count())
    }

    fn project(&self, source: &SourceRef, max_chars: usize) -> Result<String> {
        let mut summaries = Vec::new();
        let mut lines = Vec::new();
        let mut total = 0usize;

        for entry in self.entries(source)? {
            let role = match entry.kind.as_str() {
                "summary" => {
                    if let Some(summary) = entry.summary() {
                        total += summary.chars().count();
                        summaries.push(format!("[Conversation summary]: {summary}"));
                    }
                    continue;
                }
                "user" => "User",
                "assistant" => "Assistant",
                _ => continue,
            };

            for text in entry.texts() {
                let text = truncate_chars(text, PER_TEXT_LIMIT);
                total += text.chars().count();
                lines.push(format!("{role}: {text}"));
            }

            if total > max_chars {
                lines.push(CONVERSATION_TRUNCATED.to_string());
                break;
            }
        }

        // 後から見つかった summary ほど前に置く
        summaries.reverse();
        summaries.extend(lines);
        Ok(summaries.join("\n\n"))
    }
}

/// Finds the transcript of the previous session for a working directory.
#[derive(Debug, Clone)]
pub struct TranscriptLocator {
    transcripts_dir: PathBuf,
}

impl TranscriptLocator {
    pub fn new(transcripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            transcripts_dir: transcripts_dir.into(),
        }
    }

    /// `/Users/a/project` → `-Users-a-project`
    pub fn encode_cwd(cwd: &Path) -> String {
        let encoded = cwd.to_string_lossy().replace('/', "-");
        if encoded.starts_with('-') {
            encoded
        } else {
            format!("-{encoded}")
        }
    }

    /// Most recently modified transcript for `cwd`, excluding the current session.
    pub fn previous_transcript(&self, current: &SessionId, cwd: &Path) -> Option<SourceRef> {
        let mut candidates = self.project_transcripts(cwd);
        if candidates.is_empty() {
            debug!(cwd = %cwd.display(), "no project folder matched, searching all transcripts");
            candidates = self.all_transcripts();
        }

        candidates
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .map(|n| !n.to_string_lossy().contains(current.as_str()))
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((mtime, path))
            })
            .max_by_key(|(mtime, _): &(SystemTime, PathBuf)| *mtime)
            .map(|(_, path)| SourceRef::new(path))
    }

    fn project_transcripts(&self, cwd: &Path) -> Vec<PathBuf> {
        let encoded = Self::encode_cwd(cwd);
        let Ok(entries) = fs::read_dir(&self.transcripts_dir) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if !path.is_dir() || !name.starts_with(&encoded) {
                continue;
            }
            if let Ok(files) = fs::read_dir(&path) {
                found.extend(
                    files
                        .flatten()
                        .map(|f| f.path())
                        .filter(|p| is_transcript(p)),
                );
            }
        }
        found
    }

    fn all_transcripts(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.transcripts_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_transcript(p))
            .collect()
    }
}

fn is_transcript(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == TRANSCRIPT_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_lines(path: &Path, lines: &[&str]) {
        fs::write(path, lines.join("\n")).unwrap();
    }

    #[test]
    fn counts_only_user_entries_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        write_lines(
            &path,
            &[
                r#"{"type":"user","message":{"content":"hi"}}"#,
                r#"{"type":"assistant","message":{"content":"hello"}}"#,
                "not json at all",
                "",
                r#"{"type":"user","message":{"content":[{"type":"tool_result","content":"x"}]}}"#,
            ],
        );

        let reader = JsonlTranscriptReader::new();
        assert_eq!(reader.count_qualifying(&SourceRef::new(&path)).unwrap(), 2);
    }

    #[test]
    fn invalid_utf8_line_skips_only_that_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        let mut raw = br#"{"type":"user","message":{"content":"one"}}"#.to_vec();
        raw.extend_from_slice(b"\n\xff\xfe garbage\n");
        for n in ["two", "three", "four", "five", "six"] {
            raw.extend_from_slice(
                format!(r#"{{"type":"user","message":{{"content":"{n}"}}}}"#).as_bytes(),
            );
            raw.push(b'\n');
        }
        fs::write(&path, raw).unwrap();

        let reader = JsonlTranscriptReader::new();
        let source = SourceRef::new(&path);
        assert_eq!(reader.count_qualifying(&source).unwrap(), 6);
        let text = reader.project(&source, 20_000).unwrap();
        assert!(text.starts_with("User: one\n\n"));
        assert!(text.ends_with("User: six"));
    }

    #[rstest]
    #[case::message_is_string(r#"{"type":"user","message":"plain"}"#)]
    #[case::content_is_number(r#"{"type":"user","message":{"content":42}}"#)]
    #[case::no_message(r#"{"type":"user"}"#)]
    #[case::summary_not_string(r#"{"type":"user","summary":7}"#)]
    fn user_line_counts_whatever_the_message_shape(#[case] line: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        write_lines(&path, &[line, r#"{"type":"user","message":{"content":"ok"}}"#]);

        let reader = JsonlTranscriptReader::new();
        let source = SourceRef::new(&path);
        assert_eq!(reader.count_qualifying(&source).unwrap(), 2);
        assert_eq!(reader.project(&source, 100).unwrap(), "User: ok");
    }

    #[test]
    fn projection_labels_roles_and_puts_summary_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        write_lines(
            &path,
            &[
                r#"{"type":"user","message":{"content":"how do I rebase?"}}"#,
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Bash"},{"type":"text","text":"use git rebase -i"}]}}"#,
                r#"{"type":"summary","summary":"git help"}"#,
            ],
        );

        let text = JsonlTranscriptReader::new()
            .project(&SourceRef::new(&path), 20_000)
            .unwrap();
        assert_eq!(
            text,
            "[Conversation summary]: git help\n\nUser: how do I rebase?\n\nAssistant: use git rebase -i"
        );
    }

    #[test]
    fn projection_is_bounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        let long = "あ".repeat(1_000);
        let line = format!(r#"{{"type":"user","message":{{"content":"{long}"}}}}"#);
        write_lines(&path, &[&line, &line, &line]);

        let text = JsonlTranscriptReader::new()
            .project(&SourceRef::new(&path), 1_000)
            .unwrap();
        let parts: Vec<_> = text.split("\n\n").collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].ends_with(TEXT_TRUNCATED));
        assert_eq!(parts[2], CONVERSATION_TRUNCATED);
    }

    #[test]
    fn projection_of_tool_only_session_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        write_lines(
            &path,
            &[r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read"}]}}"#],
        );
        let text = JsonlTranscriptReader::new()
            .project(&SourceRef::new(&path), 100)
            .unwrap();
        assert!(text.is_empty());
    }

    #[rstest]
    #[case::absolute("/Users/a/project", "-Users-a-project")]
    #[case::relative("work/x", "-work-x")]
    fn cwd_encoding(#[case] cwd: &str, #[case] expected: &str) {
        assert_eq!(TranscriptLocator::encode_cwd(Path::new(cwd)), expected);
    }

    #[test]
    fn locator_picks_newest_excluding_current_session() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("-work-app");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(dir.path().join("-elsewhere")).unwrap();

        let older = project.join("older.jsonl");
        let newer = project.join("newer.jsonl");
        let current = project.join("current-session.jsonl");
        write_lines(&older, &["{}"]);
        std::thread::sleep(Duration::from_millis(20));
        write_lines(&newer, &["{}"]);
        std::thread::sleep(Duration::from_millis(20));
        write_lines(&current, &["{}"]);
        write_lines(&dir.path().join("-elsewhere").join("other.jsonl"), &["{}"]);

        let locator = TranscriptLocator::new(dir.path());
        let found = locator
            .previous_transcript(&SessionId::new("current-session"), Path::new("/work/app"))
            .unwrap();
        assert_eq!(found.path(), newer.as_path());
    }

    #[test]
    fn locator_falls_back_to_recursive_search() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("-other").join("sub");
        fs::create_dir_all(&nested).unwrap();
        let only = nested.join("a.jsonl");
        write_lines(&only, &["{}"]);

        let locator = TranscriptLocator::new(dir.path());
        let found = locator
            .previous_transcript(&SessionId::new("x"), Path::new("/no/match"))
            .unwrap();
        assert_eq!(found.path(), only.as_path());

        assert!(
            TranscriptLocator::new(dir.path().join("missing"))
                .previous_transcript(&SessionId::new("x"), Path::new("/no/match"))
                .is_none()
        );
    }
}
