//! Classification and aggregation over a fetched budget snapshot.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock. The
//! caller passes "today" explicitly, already resolved in the user's timezone.

use api_types::{
    account::Account, category::Category, payee::Payee, transaction::Transaction,
};

pub use aggregate::{CategorySpend, Dashboard, DaySpend, TOP_CATEGORIES};
pub use classify::{Classifier, TransferKind};
pub use currency::Currency;
pub use error::EngineError;
pub use money::Money;
pub use rollup::{BudgetRollup, Figure, RollupMismatch, rollup};
pub use window::{DateRange, Granularity, filter_window, sort_newest_first, window_start};

pub mod aggregate;
pub mod classify;
mod currency;
mod error;
mod money;
mod rollup;
pub mod window;

/// Immutable view of everything fetched for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub payees: Vec<Payee>,
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Classifier indexing accounts, payees and transactions of this snapshot.
    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(&self.accounts, &self.payees).with_transactions(&self.transactions)
    }

    pub fn category_name(&self, id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    pub fn account_name(&self, id: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.as_str())
    }
}
