//! Calendar windows over transaction dates.
//!
//! Weeks, months and years are calendar units, not fixed multiples of 24h:
//! going back one month from `2024-03-31` lands on `2024-02-29`.

use std::str::FromStr;

use api_types::{MonthKey, transaction::Transaction};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for Granularity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Self::Day),
            "week" | "weeks" => Ok(Self::Week),
            "month" | "months" => Ok(Self::Month),
            "year" | "years" => Ok(Self::Year),
            other => Err(EngineError::InvalidGranularity(other.to_string())),
        }
    }
}

/// Subtract `count` calendar units from `today`.
///
/// Saturates at the earliest representable date.
pub fn window_start(today: NaiveDate, granularity: Granularity, count: u32) -> NaiveDate {
    let start = match granularity {
        Granularity::Day => today.checked_sub_days(Days::new(u64::from(count))),
        Granularity::Week => today.checked_sub_days(Days::new(u64::from(count) * 7)),
        Granularity::Month => today.checked_sub_months(Months::new(count)),
        Granularity::Year => today.checked_sub_months(Months::new(count.saturating_mul(12))),
    };
    start.unwrap_or(NaiveDate::MIN)
}

/// Transactions dated on or after `cutoff`.
pub fn since(
    transactions: &[Transaction],
    cutoff: NaiveDate,
) -> impl Iterator<Item = &Transaction> {
    transactions.iter().filter(move |tx| tx.date >= cutoff)
}

/// Transactions inside the last `count` units ending at `today`.
pub fn filter_window(
    transactions: &[Transaction],
    today: NaiveDate,
    granularity: Granularity,
    count: u32,
) -> Vec<&Transaction> {
    since(transactions, window_start(today, granularity, count)).collect()
}

/// Newest first; ties broken by id so merged fan-out results sort the same
/// way regardless of arrival order.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

/// Inclusive range of calendar dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn month(month: MonthKey) -> Self {
        Self {
            start: month.first_day(),
            end: month.last_day(),
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
