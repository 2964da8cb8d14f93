//! Implementations - ports の具体実装
//!
//! すべてファイルシステム上で動く。ストレージルートは `StoreLayout` で注入される。

pub mod claude_cli;
pub mod file_lease;
pub mod fs_ledger;
pub mod fs_queue;
pub mod fs_records;
mod fs_util;
pub mod transcript;

pub use claude_cli::{ProcessSummarizer, SUMMARY_PROMPT};
pub use file_lease::FileLease;
pub use fs_ledger::{FsDedupLedger, dedup_key};
pub use fs_queue::FsTaskQueue;
pub use fs_records::FsRecordStore;
pub use transcript::{JsonlTranscriptReader, TranscriptLocator};
