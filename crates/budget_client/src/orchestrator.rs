use std::sync::Arc;

use api_types::{
    MonthKey,
    account::Account,
    budget::BudgetMonth,
    transaction::{Transaction, TransactionQuery},
};
use chrono::NaiveDate;
use engine::{BudgetRollup, Snapshot, rollup, sort_newest_first};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    BudgetApi,
    error::{ClientError, Result},
    log::DiagnosticLog,
};

/// An account with its balance, `None` when the balance could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBalance {
    pub account: Account,
    pub balance: Option<i64>,
}

/// A budget month with its category groups rechecked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetMonthView {
    pub summary: BudgetMonth,
    pub rollup: BudgetRollup,
}

/// Fans fetches out over a backend, at most `max_in_flight` at a time.
///
/// Dropping any returned future aborts the requests it spawned.
#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn BudgetApi>,
    log: Arc<DiagnosticLog>,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn BudgetApi>, log: Arc<DiagnosticLog>, max_in_flight: usize) -> Self {
        Self {
            api,
            log,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn api(&self) -> &Arc<dyn BudgetApi> {
        &self.api
    }

    /// One fetch per account, merged in completion order.
    ///
    /// The first failure aborts the remaining fetches and is returned as is.
    pub async fn fetch_transactions(
        &self,
        accounts: &[Account],
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        let mut tasks = JoinSet::new();
        for account in accounts {
            let api = Arc::clone(&self.api);
            let permits = Arc::clone(&self.permits);
            let account_id = account.id.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|err| ClientError::Task(err.to_string()))?;
                let result = api.fetch_transactions(&account_id, query).await;
                result.map_err(|err| {
                    tracing::warn!(account = %account_id, "transaction fetch failed: {err}");
                    err
                })
            });
        }

        let mut merged = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let batch = match joined {
                Ok(Ok(batch)) => batch,
                Ok(Err(err)) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(ClientError::Task(err.to_string()));
                }
            };
            merged.extend(batch);
        }
        tracing::debug!(
            accounts = accounts.len(),
            transactions = merged.len(),
            "transactions merged"
        );
        Ok(merged)
    }

    /// Balances for every account, in input order. A failed row gets `None`
    /// and a warning; it never fails the list.
    pub async fn account_balances(
        &self,
        accounts: &[Account],
        cutoff: Option<NaiveDate>,
    ) -> Vec<AccountBalance> {
        let mut tasks = JoinSet::new();
        for (index, account) in accounts.iter().enumerate() {
            let api = Arc::clone(&self.api);
            let permits = Arc::clone(&self.permits);
            let account_id = account.id.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => api.fetch_account_balance(&account_id, cutoff).await,
                    Err(err) => Err(ClientError::Task(err.to_string())),
                };
                (index, result)
            });
        }

        let mut balances = vec![None; accounts.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(balance))) => balances[index] = Some(balance),
                Ok((index, Err(err))) => {
                    self.log.warning(
                        "orchestrator.balance",
                        "account balance unavailable",
                        [
                            ("account", accounts[index].id.clone()),
                            ("error", err.to_string()),
                        ],
                    );
                }
                Err(err) => {
                    self.log.warning(
                        "orchestrator.balance",
                        "balance task failed",
                        [("error", err.to_string())],
                    );
                }
            }
        }

        accounts
            .iter()
            .cloned()
            .zip(balances)
            .map(|(account, balance)| AccountBalance { account, balance })
            .collect()
    }

    /// Reference data plus every account's transactions since `since`,
    /// newest first.
    pub async fn load_snapshot(&self, since: NaiveDate) -> Result<Snapshot> {
        let (accounts, categories, payees) = tokio::try_join!(
            self.api.fetch_accounts(),
            self.api.fetch_categories(),
            self.api.fetch_payees(),
        )?;

        let mut transactions = self
            .fetch_transactions(&accounts, TransactionQuery::since(since))
            .await?;
        sort_newest_first(&mut transactions);

        Ok(Snapshot {
            accounts,
            categories,
            payees,
            transactions,
        })
    }

    /// Fetches a budget month and rechecks its groups; every figure the server
    /// got wrong is logged as a warning.
    pub async fn budget_month(&self, month: MonthKey) -> Result<BudgetMonthView> {
        let (summary, groups) = tokio::try_join!(
            self.api.fetch_budget_month(month),
            self.api.fetch_budget_category_groups(month),
        )?;

        let rollup = rollup(groups);
        for mismatch in &rollup.mismatches {
            self.log.warning(
                "rollup.mismatch",
                "budget figure disagrees with its categories",
                [
                    ("month", month.to_string()),
                    ("group", mismatch.group_id.clone()),
                    ("category", mismatch.category_id.clone().unwrap_or_default()),
                    ("figure", format!("{:?}", mismatch.figure).to_lowercase()),
                    ("reported", mismatch.reported.to_string()),
                    ("expected", mismatch.expected.to_string()),
                ],
            );
        }

        Ok(BudgetMonthView { summary, rollup })
    }
}
