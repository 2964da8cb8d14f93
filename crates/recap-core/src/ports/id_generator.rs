//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース。timestamp 部分は Clock から取るので、
//!   FixedClock を使えば enqueue 時刻を決定的にできる。同じミリ秒内では
//!   直前の ID を increment するので、生成順 = ソート順になる。

use crate::domain::ids::{CycleId, TaskId};
use crate::ports::Clock;
use std::sync::{Arc, Mutex};
use ulid::Ulid;

/// IdGenerator は時刻順にソート可能な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（Arc で共有される）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_cycle_id(&self) -> CycleId;
}

pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
    last: Mutex<Option<Ulid>>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        // 時計が戻ったら clock の時刻から採り直す
        let next = (*last)
            .filter(|prev| prev.timestamp_ms() == timestamp_ms)
            .and_then(|prev| prev.increment())
            .unwrap_or_else(|| Ulid::from_parts(timestamp_ms, rand::random()));
        *last = Some(next);
        next
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_cycle_id(&self) -> CycleId {
        CycleId::from(self.next_ulid())
    }
}
