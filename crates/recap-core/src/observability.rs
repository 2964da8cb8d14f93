//! Observability - ログの初期化
//!
//! hook から呼ばれるので stdout / stderr には何も書かない。
//! 出力先は `<root>/recap.log` のみ（追記、ローテーションなし）。
//! フィルタは `RECAP_LOG`（未設定なら `info`）。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::StoreLayout;
use crate::error::{RecapError, Result};

pub const ENV_LOG_FILTER: &str = "RECAP_LOG";
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Keep the returned guard alive until exit,
/// dropping it flushes buffered lines.
pub fn init_logging(layout: &StoreLayout) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&layout.root).map_err(|e| RecapError::io(&layout.root, e))?;

    let appender = tracing_appender::rolling::never(&layout.root, StoreLayout::LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(ENV_LOG_FILTER)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| RecapError::Other(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
