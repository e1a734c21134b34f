//! Calendar month and day-key helpers.
//!
//! # Invariants
//! - Two dates are cache-equivalent iff their `date_key` strings are equal.
//! - `CalendarMonth::month` is always in `1..=12`.

use chrono::{Datelike, Months, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` key of a calendar day.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a canonical `YYYY-MM-DD` key.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_KEY_FORMAT).ok()
}

/// One displayed calendar month.
///
/// Serialized as `{ "year": .., "month": .. }`; deserialization goes through
/// [`CalendarMonth::new`] and rejects months outside `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl<'de> Deserialize<'de> for CalendarMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Parts {
            year: i32,
            month: u32,
        }

        let parts = Parts::deserialize(deserializer)?;
        Self::new(parts.year, parts.month).ok_or_else(|| {
            D::Error::custom(format!(
                "invalid calendar month {}-{:02}",
                parts.year, parts.month
            ))
        })
    }
}

impl CalendarMonth {
    /// Returns `None` when `month` is outside `1..=12` or the year is
    /// outside the supported date range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }

    /// Month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `YYYY-MM`.
    pub fn parse(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn next(self) -> Option<Self> {
        self.first_day()
            .checked_add_months(Months::new(1))
            .map(Self::of)
    }

    pub fn previous(self) -> Option<Self> {
        self.first_day()
            .checked_sub_months(Months::new(1))
            .map(Self::of)
    }

    /// Days in this month, first to last.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |day| *day <= last)
    }
}

impl Display for CalendarMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::{date_key, parse_date_key, CalendarMonth};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_key_is_zero_padded() {
        assert_eq!(date_key(day(2024, 7, 3)), "2024-07-03");
        assert_eq!(parse_date_key("2024-07-03"), Some(day(2024, 7, 3)));
        assert_eq!(parse_date_key("2024-7-3x"), None);
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        let feb = CalendarMonth::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), day(2024, 2, 1));
        assert_eq!(feb.last_day(), day(2024, 2, 29));
        assert_eq!(feb.days().count(), 29);
        assert_eq!(CalendarMonth::new(2023, 2).unwrap().last_day(), day(2023, 2, 28));
    }

    #[test]
    fn navigation_crosses_year_boundaries() {
        let dec = CalendarMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), CalendarMonth::new(2025, 1));
        assert_eq!(CalendarMonth::new(2025, 1).unwrap().previous(), Some(dec));
    }

    #[test]
    fn parse_and_display_agree() {
        let month = CalendarMonth::parse("2024-07").unwrap();
        assert_eq!(month.to_string(), "2024-07");
        assert!(CalendarMonth::parse("2024-13").is_none());
        assert!(CalendarMonth::new(2024, 0).is_none());
    }
}
