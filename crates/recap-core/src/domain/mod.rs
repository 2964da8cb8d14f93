//! Domain model (ids, tasks, outcomes, calendar).
//!
//! I/O を持たない純粋な型と関数だけを置く。

pub mod calendar;
pub mod ids;
pub mod outcome;
pub mod record;
pub mod task;

pub use calendar::{WeekRange, concluded_month, is_trigger_day, month_key};
pub use ids::{CycleId, SessionId, TaskId, TaskName};
pub use outcome::{Summary, TaskOutcome};
pub use record::DailyEntry;
pub use task::{PendingTask, SourceRef, SummaryTask};
