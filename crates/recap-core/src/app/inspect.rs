//! Inspect - 読み取り専用の照会（show / list / search / status）
//!
//! 何も書き換えない。ロックも取らない（status の保持確認だけは一瞬取って離す）。
//! 整形は CLI 側の仕事で、ここはデータを返すだけ。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::StoreLayout;
use crate::domain::record::count_entries;
use crate::domain::{WeekRange, is_trigger_day};
use crate::error::{RecapError, Result};
use crate::ports::{Clock, DedupLedger, ExclusiveLease, RecordStore, TaskQueue};

const LOG_TAIL_LINES: usize = 10;

/// What `show` should print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTarget {
    Today,
    /// Dailies from this week's Monday onwards.
    Week,
    /// Every daily, weekly and archived weekly.
    All,
    Date(NaiveDate),
}

impl FromStr for ShowTarget {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "today" => Ok(ShowTarget::Today),
            "week" => Ok(ShowTarget::Week),
            "all" => Ok(ShowTarget::All),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(ShowTarget::Date)
                .map_err(|_| {
                    RecapError::Other(format!(
                        "unknown target `{other}` (expected today, week, all or YYYY-MM-DD)"
                    ))
                }),
        }
    }
}

/// Identity of one stored record, printed as its path relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordKey {
    Daily(NaiveDate),
    Weekly(NaiveDate),
    Archived { month: String, monday: NaiveDate },
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Daily(date) => write!(f, "daily/{date}.md"),
            RecordKey::Weekly(monday) => write!(f, "weekly/week-{monday}.md"),
            RecordKey::Archived { month, monday } => write!(f, "monthly/{month}/week-{monday}.md"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: RecordKey,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Date and number of entries.
    pub dailies: Vec<(NaiveDate, usize)>,
    pub weeklies: Vec<NaiveDate>,
    /// Month key and number of archived weeklies.
    pub months: Vec<(String, usize)>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.dailies.is_empty() && self.weeklies.is_empty() && self.months.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub key: RecordKey,
    /// 1-based.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub root: PathBuf,
    pub queued: usize,
    pub resolved: usize,
    pub model: String,
    pub gate_held: bool,
    pub trigger_day: bool,
    pub recent_log: Vec<String>,
}

pub struct Inspector {
    layout: StoreLayout,
    model: String,
    records: Arc<dyn RecordStore>,
    queue: Arc<dyn TaskQueue>,
    ledger: Arc<dyn DedupLedger>,
    lease: Arc<dyn ExclusiveLease>,
    clock: Arc<dyn Clock>,
}

impl Inspector {
    pub fn new(
        layout: StoreLayout,
        model: impl Into<String>,
        records: Arc<dyn RecordStore>,
        queue: Arc<dyn TaskQueue>,
        ledger: Arc<dyn DedupLedger>,
        lease: Arc<dyn ExclusiveLease>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            layout,
            model: model.into(),
            records,
            queue,
            ledger,
            lease,
            clock,
        }
    }

    /// Sections in display order. Empty means nothing recorded for the target.
    pub fn show(&self, target: ShowTarget) -> Result<Vec<Section>> {
        match target {
            ShowTarget::Today => self.dailies_where(|d| d == self.clock.today()),
            ShowTarget::Date(date) => self.dailies_where(|d| d == date),
            ShowTarget::Week => {
                let monday = WeekRange::containing(self.clock.today()).monday;
                self.dailies_where(|d| d >= monday)
            }
            ShowTarget::All => self.all_records(),
        }
    }

    fn dailies_where(&self, pred: impl Fn(NaiveDate) -> bool) -> Result<Vec<Section>> {
        let mut sections = Vec::new();
        for date in self.records.daily_dates()?.into_iter().filter(|d| pred(*d)) {
            if let Some(content) = self.records.read_daily(date)? {
                sections.push(Section {
                    key: RecordKey::Daily(date),
                    content,
                });
            }
        }
        Ok(sections)
    }

    fn all_records(&self) -> Result<Vec<Section>> {
        let mut sections = self.dailies_where(|_| true)?;

        for monday in self.records.weekly_mondays()? {
            if let Some(content) = self.records.read_weekly(monday)? {
                sections.push(Section {
                    key: RecordKey::Weekly(monday),
                    content,
                });
            }
        }

        for month in self.records.archived_months()? {
            for monday in self.records.archived_weeklies(&month)? {
                if let Some(content) = self.records.read_archived(&month, monday)? {
                    sections.push(Section {
                        key: RecordKey::Archived {
                            month: month.clone(),
                            monday,
                        },
                        content,
                    });
                }
            }
        }
        Ok(sections)
    }

    pub fn list(&self) -> Result<Listing> {
        let mut listing = Listing::default();

        for date in self.records.daily_dates()? {
            let entries = self
                .records
                .read_daily(date)?
                .map(|c| count_entries(&c))
                .unwrap_or(0);
            listing.dailies.push((date, entries));
        }
        listing.weeklies = self.records.weekly_mondays()?;
        for month in self.records.archived_months()? {
            let count = self.records.archived_weeklies(&month)?.len();
            listing.months.push((month, count));
        }
        Ok(listing)
    }

    /// Case-insensitive line search across dailies, weeklies and archives.
    pub fn search(&self, keyword: &str) -> Result<Vec<SearchHit>> {
        let needle = keyword.to_lowercase();
        let mut hits = Vec::new();
        for section in self.all_records()? {
            for (idx, line) in section.content.lines().enumerate() {
                if line.to_lowercase().contains(&needle) {
                    hits.push(SearchHit {
                        key: section.key.clone(),
                        line: idx + 1,
                        text: line.trim().to_string(),
                    });
                }
            }
        }
        Ok(hits)
    }

    pub fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            root: self.layout.root.clone(),
            queued: self.queue.len()?,
            resolved: self.ledger.len()?,
            model: self.model.clone(),
            gate_held: self.lease.is_held()?,
            trigger_day: is_trigger_day(self.clock.today()),
            recent_log: self.log_tail()?,
        })
    }

    fn log_tail(&self) -> Result<Vec<String>> {
        let path = &self.layout.log_file;
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RecapError::io(path, e)),
        };
        let text = String::from_utf8_lossy(&raw);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(LOG_TAIL_LINES);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }
}
