//! Text format of daily and weekly records.
//!
//! ```text
//! # 2026-10-19
//!
//! ---
//!
//! ### ⏰ 14:05  `a1b2c3d4`
//!
//! <summary text>
//! ```
//!
//! A weekly record is a header line followed by each daily record's content,
//! each preceded by a blank line.

use chrono::{NaiveDate, NaiveTime};

use super::WeekRange;

/// Prefix of every entry heading; `list` counts entries by it, so it must not
/// collide with ordinary markdown headings inside a summary.
pub const ENTRY_HEADING: &str = "### ⏰ ";

pub fn daily_header(date: NaiveDate) -> String {
    format!("# {date}\n")
}

pub fn weekly_header(week: &WeekRange) -> String {
    format!("# Week {} ~ {}\n", week.monday, week.sunday)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyEntry {
    pub time: NaiveTime,
    pub session_short: String,
    pub text: String,
}

impl DailyEntry {
    pub fn render(&self) -> String {
        let mut out = format!("\n---\n\n{ENTRY_HEADING}{}", self.time.format("%H:%M"));
        if !self.session_short.is_empty() {
            out.push_str(&format!("  `{}`", self.session_short));
        }
        out.push_str(&format!("\n\n{}\n", self.text));
        out
    }
}

/// Concatenate daily records (already sorted by date) into a weekly record.
pub fn fold_week(week: &WeekRange, dailies: &[String]) -> String {
    let mut out = weekly_header(week);
    for daily in dailies {
        out.push('\n');
        out.push_str(daily);
    }
    out
}

pub fn count_entries(content: &str) -> usize {
    content
        .lines()
        .filter(|line| line.starts_with(ENTRY_HEADING))
        .count()
}
