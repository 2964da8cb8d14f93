//! FsRecordStore - daily / weekly / monthly を Markdown ファイルで保持
//!
//! レイアウトは `StoreLayout` を参照。

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

use super::fs_util::{atomic_write, read_if_exists, remove_if_exists, sorted_file_names};
use crate::config::StoreLayout;
use crate::domain::record::daily_header;
use crate::error::{RecapError, Result};
use crate::ports::{ArchiveMove, RecordStore, WeeklyLocation};

const MD_EXT: &str = ".md";
const WEEK_PREFIX: &str = "week-";
const MAINTENANCE_PREFIX: &str = ".maintenance-";

pub struct FsRecordStore {
    layout: StoreLayout,
}

impl FsRecordStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.layout.daily_dir.join(format!("{date}{MD_EXT}"))
    }

    fn weekly_file_name(monday: NaiveDate) -> String {
        format!("{WEEK_PREFIX}{monday}{MD_EXT}")
    }

    fn weekly_path(&self, monday: NaiveDate) -> PathBuf {
        self.layout.weekly_dir.join(Self::weekly_file_name(monday))
    }

    fn archived_path(&self, month_key: &str, monday: NaiveDate) -> PathBuf {
        self.layout
            .monthly_dir
            .join(month_key)
            .join(Self::weekly_file_name(monday))
    }

    fn marker_path(&self, date: NaiveDate) -> PathBuf {
        self.layout.root.join(format!("{MAINTENANCE_PREFIX}{date}"))
    }

    fn ensure_dir(dir: &std::path::Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| RecapError::io(dir, e))
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn dates_in(names: Vec<String>, prefix: &str, suffix: &str) -> Vec<NaiveDate> {
    let mut dates: Vec<_> = names
        .iter()
        .filter_map(|name| name.strip_prefix(prefix)?.strip_suffix(suffix))
        .filter_map(parse_date)
        .collect();
    dates.sort();
    dates
}

impl RecordStore for FsRecordStore {
    fn append_daily(&self, date: NaiveDate, entry: &str) -> Result<()> {
        Self::ensure_dir(&self.layout.daily_dir)?;
        let path = self.daily_path(date);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => file
                .write_all(daily_header(date).as_bytes())
                .map_err(|e| RecapError::io(&path, e))?,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(RecapError::io(&path, e)),
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| RecapError::io(&path, e))?;
        file.write_all(entry.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| RecapError::io(&path, e))
    }

    fn daily_dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(dates_in(sorted_file_names(&self.layout.daily_dir)?, "", MD_EXT))
    }

    fn read_daily(&self, date: NaiveDate) -> Result<Option<String>> {
        read_if_exists(&self.daily_path(date))
    }

    fn remove_daily(&self, date: NaiveDate) -> Result<()> {
        remove_if_exists(&self.daily_path(date))?;
        Ok(())
    }

    fn find_weekly(&self, monday: NaiveDate) -> Result<Option<WeeklyLocation>> {
        if self.weekly_path(monday).exists() {
            return Ok(Some(WeeklyLocation::Weekly));
        }
        for month_key in self.archived_months()? {
            if self.archived_path(&month_key, monday).exists() {
                return Ok(Some(WeeklyLocation::Monthly(month_key)));
            }
        }
        Ok(None)
    }

    fn write_weekly(&self, monday: NaiveDate, content: &str) -> Result<()> {
        Self::ensure_dir(&self.layout.weekly_dir)?;
        let path = self.weekly_path(monday);
        if path.exists() {
            return Err(RecapError::Other(format!(
                "weekly record already exists: {}",
                path.display()
            )));
        }
        atomic_write(&path, content.as_bytes())
    }

    fn weekly_mondays(&self) -> Result<Vec<NaiveDate>> {
        Ok(dates_in(
            sorted_file_names(&self.layout.weekly_dir)?,
            WEEK_PREFIX,
            MD_EXT,
        ))
    }

    fn read_weekly(&self, monday: NaiveDate) -> Result<Option<String>> {
        read_if_exists(&self.weekly_path(monday))
    }

    fn archive_weekly(&self, monday: NaiveDate, month_key: &str) -> Result<ArchiveMove> {
        let src = self.weekly_path(monday);
        let dst = self.archived_path(month_key, monday);

        if let Some(existing) = read_if_exists(&dst)? {
            let Some(current) = read_if_exists(&src)? else {
                return Ok(ArchiveMove::AlreadyArchived);
            };
            if existing == current {
                remove_if_exists(&src)?;
                return Ok(ArchiveMove::AlreadyArchived);
            }
            return Ok(ArchiveMove::Conflict);
        }

        if let Some(parent) = dst.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::rename(&src, &dst).map_err(|e| RecapError::io(&src, e))?;
        Ok(ArchiveMove::Moved)
    }

    fn archived_months(&self) -> Result<Vec<String>> {
        Ok(sorted_file_names(&self.layout.monthly_dir)?
            .into_iter()
            .filter(|name| self.layout.monthly_dir.join(name).is_dir())
            .collect())
    }

    fn archived_weeklies(&self, month_key: &str) -> Result<Vec<NaiveDate>> {
        Ok(dates_in(
            sorted_file_names(&self.layout.monthly_dir.join(month_key))?,
            WEEK_PREFIX,
            MD_EXT,
        ))
    }

    fn read_archived(&self, month_key: &str, monday: NaiveDate) -> Result<Option<String>> {
        read_if_exists(&self.archived_path(month_key, monday))
    }

    fn has_maintenance_marker(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.marker_path(date).exists())
    }

    fn write_maintenance_marker(&self, date: NaiveDate) -> Result<()> {
        Self::ensure_dir(&self.layout.root)?;
        let path = self.marker_path(date);
        fs::write(&path, b"").map_err(|e| RecapError::io(&path, e))
    }

    fn maintenance_markers(&self) -> Result<Vec<NaiveDate>> {
        Ok(dates_in(
            sorted_file_names(&self.layout.root)?,
            MAINTENANCE_PREFIX,
            "",
        ))
    }

    fn remove_maintenance_marker(&self, date: NaiveDate) -> Result<()> {
        remove_if_exists(&self.marker_path(date))?;
        Ok(())
    }
}
