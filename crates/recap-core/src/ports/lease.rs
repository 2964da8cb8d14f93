//! ExclusiveLease port - システム全体で 1 つだけの排他リース
//!
//! drain + maintenance サイクル全体をガードする。
//!
//! # 設計原則
//! - 取得はノンブロッキング。取れなければ呼び出し側は即座に諦める
//! - 解放は guard の Drop（どの終了経路でも解放される）
//! - プロセスが異常終了しても取り残されない実装であること

use crate::error::Result;

/// 保持している間だけリースが有効。drop で解放される。
pub trait LeaseGuard: Send {}

pub trait ExclusiveLease: Send + Sync {
    /// `Ok(None)` means another holder is active; not an error.
    fn try_acquire(&self) -> Result<Option<Box<dyn LeaseGuard>>>;

    /// Whether someone currently holds the lease.
    fn is_held(&self) -> Result<bool> {
        Ok(self.try_acquire()?.is_none())
    }
}
