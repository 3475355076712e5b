//! Wire records shared by the budget client and the aggregation engine.
//!
//! Field names follow the REST API: entity records use `snake_case` keys while
//! budget-month totals use `camelCase`. Optional fields are omitted when
//! serialized, so a record built locally only carries what the caller set.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a `yyyy-MM` month key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key \"{0}\": expected yyyy-MM")]
pub struct MonthKeyError(pub String);

/// A calendar month, written `yyyy-MM` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthKeyError> {
        if !(1..=9999).contains(&year) {
            return Err(MonthKeyError(format!("{year}-{month:02}")));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| MonthKeyError(format!("{year}-{month:02}")))
    }

    /// The month a date falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn last_day(self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(self.0)
    }

    pub fn previous(self) -> Self {
        self.0.checked_sub_months(Months::new(1)).map_or(self, Self)
    }

    pub fn next(self) -> Self {
        self.0.checked_add_months(Months::new(1)).map_or(self, Self)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthKeyError(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let (year, month) = (&s[..4], &s[5..]);
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Account {
        pub id: String,
        pub name: String,
        /// Off-budget accounts are tracked but excluded from budget totals.
        #[serde(default)]
        pub offbudget: bool,
        #[serde(default)]
        pub closed: bool,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub offbudget: bool,
    }

    /// Request body for creating an account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountCreate {
        pub account: AccountNew,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BalanceQuery {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub cutoff_date: Option<NaiveDate>,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Category {
        pub id: String,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_income: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub hidden: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub group_id: Option<String>,
    }

    /// Reference-data grouping of categories (not month-scoped).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryGroup {
        pub id: String,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_income: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub hidden: Option<bool>,
        #[serde(default)]
        pub categories: Vec<Category>,
    }
}

pub mod payee {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Payee {
        pub id: String,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        /// Set when this payee stands for the other side of a transfer.
        #[serde(
            default,
            rename = "transfer_acct",
            skip_serializing_if = "Option::is_none"
        )]
        pub transfer_account: Option<String>,
    }
}

pub mod transaction {
    use super::*;

    /// A ledger row as stored upstream.
    ///
    /// `id` is absent until the first successful create. `payee` and
    /// `payee_name` may both be present in stored data; `payee_name` is the
    /// free-text override used when no structured payee was picked.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Transaction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub account: String,
        pub date: NaiveDate,
        /// Signed minor units: negative = outflow, positive = inflow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub payee: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub payee_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub imported_payee: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub imported_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub transfer_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub cleared: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub subtransactions: Option<Vec<SubTransaction>>,
    }

    impl Transaction {
        pub fn amount_or_zero(&self) -> i64 {
            self.amount.unwrap_or(0)
        }

        /// Split children, if the transaction has any.
        pub fn splits(&self) -> &[SubTransaction] {
            self.subtransactions.as_deref().unwrap_or(&[])
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SubTransaction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub amount: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub payee: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
    }

    /// Filters for listing an account's transactions.
    ///
    /// Serialized as the query string of the list endpoint; unset fields are
    /// left out. `page` is 1-based.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionQuery {
        #[serde(rename = "since_date", skip_serializing_if = "Option::is_none")]
        pub since: Option<NaiveDate>,
        #[serde(rename = "until_date", skip_serializing_if = "Option::is_none")]
        pub until: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub page: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub limit: Option<u32>,
    }

    impl TransactionQuery {
        pub fn since(date: NaiveDate) -> Self {
            Self {
                since: Some(date),
                ..Self::default()
            }
        }
    }

    /// Request body for creating a transaction.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionCreate {
        pub learn_categories: bool,
        pub run_transfers: bool,
        pub transaction: Transaction,
    }

    /// Request body for updating a transaction.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub transaction: Transaction,
    }
}

pub mod budget {
    use super::*;

    /// Budget totals for one calendar month.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetMonth {
        pub month: MonthKey,
        pub income_available: i64,
        pub last_month_overspent: i64,
        pub for_next_month: i64,
        pub total_budgeted: i64,
        pub to_budget: i64,
        pub from_last_month: i64,
        pub total_income: i64,
        pub total_spent: i64,
        pub total_balance: i64,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetCategoryGroup {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub is_income: bool,
        #[serde(default)]
        pub hidden: bool,
        pub budgeted: i64,
        pub spent: i64,
        pub balance: i64,
        #[serde(default)]
        pub categories: Vec<BudgetCategory>,
    }

    /// Per-category figures for a month. `spent` is non-positive for
    /// expense categories and `balance == budgeted + spent`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetCategory {
        pub id: String,
        pub name: String,
        pub budgeted: i64,
        pub spent: i64,
        pub balance: i64,
        #[serde(default)]
        pub carryover: bool,
    }
}

/// `{ "data": ... }` envelope used by every read endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}
