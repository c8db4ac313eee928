use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Integer primary key as used by the administration database
pub type RecordId = i64;

fn period_regex() -> &'static Regex {
    static PERIOD_REGEX: OnceLock<Regex> = OnceLock::new();
    PERIOD_REGEX.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap())
}

/// A calendar month parsed from a `YYYY-MM` period token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parse a `YYYY-MM` token. Returns `None` for anything that is not a real month.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = period_regex().captures(token.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructed only through `parse`, which checked the date exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Inclusive `[first_day, last_day]` membership
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.first_day()..=self.last_day()).contains(&date)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse an ISO `YYYY-MM-DD` date column value
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    // Laravel datetime columns carry a time part; only the date matters here
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
