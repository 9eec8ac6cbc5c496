//! Common types used across the ledger

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Generate a fresh text identifier for a new row
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Inclusive date window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The calendar month containing `year`/`month`.
    ///
    /// Returns `None` for a month outside 1..=12.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start + Duration::days(i64::from(days_in_month(year, month)) - 1);
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, 0 for an inverted range
    pub fn days(&self) -> i64 {
        let days = (self.end - self.start).num_days() + 1;
        days.max(0)
    }

    /// Every calendar month the range touches, in order
    pub fn months(&self) -> Vec<YearMonth> {
        let mut months = Vec::new();
        if self.end < self.start {
            return months;
        }
        let mut current = YearMonth::of(self.start);
        let last = YearMonth::of(self.end);
        while current <= last {
            months.push(current);
            current = current.next();
        }
        months
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn range(&self) -> DateRange {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default();
        let end = start + Duration::days(i64::from(self.days()) - 1);
        DateRange { start, end }
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("expected a month in YYYY-MM form, got `{0}`")]
pub struct ParseMonthError(pub String);

impl FromStr for YearMonth {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        YearMonth::new(year, month).ok_or_else(err)
    }
}

/// Days in a calendar month, 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match next {
        Some(next) => (next - first).num_days() as u32,
        None => 0,
    }
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_range_uses_calendar_bounds() {
        let feb = DateRange::month(2024, 2).unwrap();
        assert_eq!(feb.start, date(2024, 2, 1));
        assert_eq!(feb.end, date(2024, 2, 29));
        assert_eq!(feb.days(), 29);

        let apr = DateRange::month(2023, 4).unwrap();
        assert_eq!(apr.end, date(2023, 4, 30));
        assert!(DateRange::month(2023, 13).is_none());
    }

    #[test]
    fn months_spanning_year_boundary() {
        let range = DateRange::new(date(2023, 11, 15), date(2024, 2, 3));
        let months: Vec<String> = range.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let range = DateRange::new(date(2024, 3, 2), date(2024, 3, 1));
        assert_eq!(range.days(), 0);
        assert!(range.months().is_empty());
    }

    #[test]
    fn year_month_navigation() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth::new(2023, 12).unwrap());
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(jan.days(), 31);
    }

    #[test]
    fn parse_year_month() {
        assert_eq!("2024-03".parse::<YearMonth>(), Ok(YearMonth { year: 2024, month: 3 }));
        assert!("2024-00".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 0), 0);
    }
}
