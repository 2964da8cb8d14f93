//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装する。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: Config からのワイヤリング
//! - **Coordinator**: enqueue → gate → drain → rollup
//! - **RollupEngine**: daily → weekly → monthly の畳み込みと掃除
//! - **Inspector**: show / list / search / status

pub mod builder;
pub mod coordinator;
pub mod inspect;
pub mod rollup;

pub use self::builder::{App, AppBuilder, HookOutcome};
pub use self::coordinator::{
    Coordinator, CycleReport, DrainReport, DrainSettings, Gated, Ports, TriggerReport,
};
pub use self::inspect::{Inspector, Listing, RecordKey, SearchHit, Section, ShowTarget, StatusReport};
pub use self::rollup::{ArchiveSummary, MaintenanceReport, MaintenanceSummary, RollupEngine, WeeklyMerge};
