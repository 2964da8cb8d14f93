//! Domain identifiers (strongly-typed IDs).
//!
//! ## ULID ベースの ID
//! - **時刻でソート可能**: timestamp が先頭にあるため、文字列の辞書順 = 生成順
//! - **分散生成可能**: 複数プロセスが同時に enqueue しても衝突しない
//!
//! キューのファイル名は `TaskId` の ULID 文字列から始まるので、
//! ディレクトリを名前でソートするだけで FIFO 順が得られる。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を持ち、`TaskId` と `CycleId` を型レベルで区別する。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "task-", "cycle-"）
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }

    /// 生成時刻（ULID の timestamp 部分）
    pub fn created_at(&self) -> DateTime<Utc> {
        let ms = self.ulid.timestamp_ms() as i64;
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Cycle（ゲート取得から解放までの 1 回の drain + maintenance）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cycle {}

impl IdMarker for Cycle {
    fn prefix() -> &'static str {
        "cycle-"
    }
}

/// Identifier of a queued summary task.
pub type TaskId = Id<Task>;

/// Identifier of one gate-holding run, used to correlate log lines.
pub type CycleId = Id<Cycle>;

/// Identifier of the session that triggered an enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, used in task names and daily entry headings.
    pub fn short(&self) -> String {
        self.0.chars().take(8).collect()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// TaskName はキュー内のファイル名（拡張子なし）: `<ULID>-<session 8 文字>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(id: TaskId, session: &SessionId) -> Self {
        let short = sanitize(&session.short());
        Self(format!("{}-{}", id.as_ulid(), short))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Enqueue time embedded in the name, if the name was produced by [`TaskName::new`].
    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        let head = self.0.get(..ULID_LEN)?;
        let ulid = Ulid::from_str(head).ok()?;
        Some(TaskId::from_ulid(ulid).created_at())
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

const ULID_LEN: usize = 26;

// ファイル名に使えない文字を '_' に置き換える
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
