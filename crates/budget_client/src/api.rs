use api_types::{
    MonthKey,
    account::Account,
    budget::{BudgetCategoryGroup, BudgetMonth},
    category::{Category, CategoryGroup},
    payee::Payee,
    transaction::{Transaction, TransactionQuery},
};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;

/// Operations every budget backend offers, live or synthetic.
///
/// Reads fail with [`ClientError::Transport`], [`ClientError::Http`] or
/// [`ClientError::Decode`]; they never hand back partial data. Mutations are
/// fire-and-forget: callers re-fetch to observe the new state.
///
///  [`ClientError::Transport`]: crate::ClientError::Transport
///  [`ClientError::Http`]: crate::ClientError::Http
///  [`ClientError::Decode`]: crate::ClientError::Decode
#[async_trait]
pub trait BudgetApi: Send + Sync {
    async fn fetch_accounts(&self) -> Result<Vec<Account>>;

    async fn fetch_categories(&self) -> Result<Vec<Category>>;

    async fn fetch_category_groups(&self) -> Result<Vec<CategoryGroup>>;

    async fn fetch_payees(&self) -> Result<Vec<Payee>>;

    async fn fetch_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>>;

    /// Balance of one account, optionally as of `cutoff`.
    async fn fetch_account_balance(
        &self,
        account_id: &str,
        cutoff: Option<NaiveDate>,
    ) -> Result<i64>;

    async fn create_transaction(&self, account_id: &str, transaction: &Transaction) -> Result<()>;

    async fn update_transaction(&self, id: &str, transaction: &Transaction) -> Result<()>;

    async fn delete_transaction(&self, id: &str) -> Result<()>;

    async fn fetch_budget_month(&self, month: MonthKey) -> Result<BudgetMonth>;

    async fn fetch_budget_category_groups(&self, month: MonthKey)
    -> Result<Vec<BudgetCategoryGroup>>;

    /// Returns the id of the new account.
    async fn create_account(&self, name: &str, offbudget: bool) -> Result<String>;

    async fn close_account(&self, id: &str) -> Result<()>;

    async fn reopen_account(&self, id: &str) -> Result<()>;

    async fn delete_account(&self, id: &str) -> Result<()>;

    /// Sync one account with its bank, or every linked account when `None`.
    async fn bank_sync(&self, account_id: Option<&str>) -> Result<()>;
}
