//! Summarizer port - 外部のテキスト生成プロセス
//!
//! タイムアウトは呼び出し側（Coordinator）が `tokio::time::timeout` で強制する。
//! 実装は future が drop されたら子プロセスを止めること。

use async_trait::async_trait;

use crate::domain::Summary;
use crate::error::SummarizerError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, conversation: &str) -> Result<Summary, SummarizerError>;
}
