//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。ファイルシステムをデータベースとして
//! 使う部分（ディレクトリ = テーブル、ファイル名 = キー）をここで隠し、
//! 実装は `impls` に置く。組み込み DB や分散ロックへの差し替えは
//! 呼び出し側を変えずにできる。

pub mod clock;
pub mod dedup_ledger;
pub mod id_generator;
pub mod lease;
pub mod record_store;
pub mod source;
pub mod summarizer;
pub mod task_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dedup_ledger::DedupLedger;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::lease::{ExclusiveLease, LeaseGuard};
pub use self::record_store::{ArchiveMove, RecordStore, WeeklyLocation};
pub use self::source::SourceReader;
pub use self::summarizer::Summarizer;
pub use self::task_queue::TaskQueue;
