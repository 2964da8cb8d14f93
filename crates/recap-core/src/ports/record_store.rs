//! RecordStore port - daily / weekly / monthly の記録とメンテナンスマーカー
//!
//! # 設計原則
//! - daily は追記のみ。削除は rollup（weekly への畳み込み後）だけ
//! - weekly は 1 週につき 1 つ。作成後は不変
//! - monthly への移動は move（copy ではない）
//! - weekly / monthly の中身は daily の連結そのもの

use chrono::NaiveDate;

use crate::error::Result;

/// Where a weekly record currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeeklyLocation {
    Weekly,
    /// Archived under `monthly/<month key>/`.
    Monthly(String),
}

/// Result of moving one weekly record into its monthly archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveMove {
    Moved,
    /// Destination already held identical bytes; the weekly copy was dropped.
    AlreadyArchived,
    /// Destination holds different bytes; nothing was touched.
    Conflict,
}

pub trait RecordStore: Send + Sync {
    // -- daily --

    fn append_daily(&self, date: NaiveDate, entry: &str) -> Result<()>;

    /// Dates that have a daily record, ascending.
    fn daily_dates(&self) -> Result<Vec<NaiveDate>>;

    fn read_daily(&self, date: NaiveDate) -> Result<Option<String>>;

    fn remove_daily(&self, date: NaiveDate) -> Result<()>;

    // -- weekly / monthly --

    fn find_weekly(&self, monday: NaiveDate) -> Result<Option<WeeklyLocation>>;

    /// Create the weekly record atomically. Never overwrites.
    fn write_weekly(&self, monday: NaiveDate, content: &str) -> Result<()>;

    /// Mondays of weekly records still in the weekly area, ascending.
    fn weekly_mondays(&self) -> Result<Vec<NaiveDate>>;

    fn read_weekly(&self, monday: NaiveDate) -> Result<Option<String>>;

    fn archive_weekly(&self, monday: NaiveDate, month_key: &str) -> Result<ArchiveMove>;

    /// Month keys that have an archive directory, ascending.
    fn archived_months(&self) -> Result<Vec<String>>;

    /// Mondays of the weekly records inside one monthly archive, ascending.
    fn archived_weeklies(&self, month_key: &str) -> Result<Vec<NaiveDate>>;

    fn read_archived(&self, month_key: &str, monday: NaiveDate) -> Result<Option<String>>;

    // -- maintenance markers --

    fn has_maintenance_marker(&self, date: NaiveDate) -> Result<bool>;

    fn write_maintenance_marker(&self, date: NaiveDate) -> Result<()>;

    fn maintenance_markers(&self) -> Result<Vec<NaiveDate>>;

    fn remove_maintenance_marker(&self, date: NaiveDate) -> Result<()>;
}
