//! SourceReader port - セッションのトランスクリプト（読み取り専用）
//!
//! # 責務
//! - 存在確認
//! - qualifying entry（ユーザー発話）の数え上げ
//! - 要約用のサイズ上限付きテキスト射影
//!
//! 壊れた行はスキップする（全体の失敗にはしない）。

use crate::domain::SourceRef;
use crate::error::Result;

pub trait SourceReader: Send + Sync {
    fn exists(&self, source: &SourceRef) -> bool;

    fn count_qualifying(&self, source: &SourceRef) -> Result<usize>;

    /// Plain-text projection of at most roughly `max_chars` characters.
    fn project(&self, source: &SourceRef, max_chars: usize) -> Result<String>;
}
