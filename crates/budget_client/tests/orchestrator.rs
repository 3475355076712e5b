use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::{
    MonthKey,
    account::Account,
    budget::{BudgetCategory, BudgetCategoryGroup, BudgetMonth},
    category::{Category, CategoryGroup},
    payee::Payee,
    transaction::{Transaction, TransactionQuery},
};
use async_trait::async_trait;
use budget_client::{
    BudgetApi, ClientError, DemoClient, DiagnosticLog, Level, Orchestrator, Redactor, Result,
};
use chrono::NaiveDate;
use reqwest::StatusCode;

/// Backend whose transaction and balance calls can be slowed down or failed
/// for chosen accounts.
#[derive(Default)]
struct Stub {
    fail_on: Option<&'static str>,
    delay: Duration,
    started: AtomicUsize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    groups: Vec<BudgetCategoryGroup>,
}

impl Stub {
    async fn enter(&self, account_id: &str) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = if self.fail_on == Some(account_id) {
            Err(ClientError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("{account_id} is broken"),
            })
        } else {
            tokio::time::sleep(self.delay).await;
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}

fn accounts(n: usize) -> Vec<Account> {
    (1..=n)
        .map(|i| Account {
            id: i.to_string(),
            name: format!("Account {i}"),
            offbudget: false,
            closed: false,
        })
        .collect()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn log() -> Arc<DiagnosticLog> {
    Arc::new(DiagnosticLog::in_memory(Redactor::new()))
}

#[async_trait]
impl BudgetApi for Stub {
    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        Ok(accounts(3))
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        Ok(Vec::new())
    }

    async fn fetch_category_groups(&self) -> Result<Vec<CategoryGroup>> {
        Ok(Vec::new())
    }

    async fn fetch_payees(&self) -> Result<Vec<Payee>> {
        Ok(Vec::new())
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        _query: TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        self.enter(account_id).await?;
        Ok(vec![Transaction {
            id: Some(format!("tx-{account_id}")),
            account: account_id.to_string(),
            date: date("2024-03-10"),
            amount: Some(-100),
            ..Transaction::default()
        }])
    }

    async fn fetch_account_balance(
        &self,
        account_id: &str,
        _cutoff: Option<NaiveDate>,
    ) -> Result<i64> {
        self.enter(account_id).await?;
        Ok(account_id.parse::<i64>().unwrap_or_default() * 1000)
    }

    async fn create_transaction(&self, _: &str, _: &Transaction) -> Result<()> {
        Ok(())
    }

    async fn update_transaction(&self, _: &str, _: &Transaction) -> Result<()> {
        Ok(())
    }

    async fn delete_transaction(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_budget_month(&self, month: MonthKey) -> Result<BudgetMonth> {
        Ok(BudgetMonth {
            month,
            income_available: 0,
            last_month_overspent: 0,
            for_next_month: 0,
            total_budgeted: 0,
            to_budget: 0,
            from_last_month: 0,
            total_income: 0,
            total_spent: 0,
            total_balance: 0,
        })
    }

    async fn fetch_budget_category_groups(&self, _: MonthKey) -> Result<Vec<BudgetCategoryGroup>> {
        Ok(self.groups.clone())
    }

    async fn create_account(&self, _: &str, _: bool) -> Result<String> {
        Ok("new".to_string())
    }

    async fn close_account(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn reopen_account(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_account(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn bank_sync(&self, _: Option<&str>) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn merges_every_account() {
    let stub = Arc::new(Stub::default());
    let orchestrator = Orchestrator::new(stub, log(), 4);

    let mut merged = orchestrator
        .fetch_transactions(&accounts(5), TransactionQuery::default())
        .await
        .unwrap();
    merged.sort_by(|a, b| a.account.cmp(&b.account));

    let owners: Vec<_> = merged.iter().map(|t| t.account.as_str()).collect();
    assert_eq!(owners, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn one_failing_account_fails_the_whole_fetch() {
    let stub = Arc::new(Stub {
        fail_on: Some("3"),
        delay: Duration::from_millis(200),
        ..Stub::default()
    });
    let orchestrator = Orchestrator::new(stub.clone(), log(), 5);

    let err = orchestrator
        .fetch_transactions(&accounts(5), TransactionQuery::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    // The slow fetches were aborted, not awaited.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(stub.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fan_out_respects_concurrency_limit() {
    let stub = Arc::new(Stub {
        delay: Duration::from_millis(20),
        ..Stub::default()
    });
    let orchestrator = Orchestrator::new(stub.clone(), log(), 2);

    let merged = orchestrator
        .fetch_transactions(&accounts(8), TransactionQuery::default())
        .await
        .unwrap();

    assert_eq!(merged.len(), 8);
    assert!(stub.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn dropping_the_fetch_cancels_in_flight_requests() {
    let stub = Arc::new(Stub {
        delay: Duration::from_millis(300),
        ..Stub::default()
    });
    let orchestrator = Orchestrator::new(stub.clone(), log(), 5);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        orchestrator.fetch_transactions(&accounts(5), TransactionQuery::default()),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(stub.started.load(Ordering::SeqCst), 5);
    assert_eq!(stub.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_balance_only_blanks_its_row() {
    let stub = Arc::new(Stub {
        fail_on: Some("2"),
        ..Stub::default()
    });
    let log = log();
    let orchestrator = Orchestrator::new(stub, Arc::clone(&log), 4);

    let rows = orchestrator.account_balances(&accounts(3), None).await;

    let balances: Vec<_> = rows.iter().map(|r| r.balance).collect();
    assert_eq!(balances, vec![Some(1000), None, Some(3000)]);
    let ids: Vec<_> = rows.iter().map(|r| r.account.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let records = log.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Warning);
    assert_eq!(records[0].metadata["account"], "2");
}

#[tokio::test]
async fn budget_month_reports_server_inconsistencies() {
    let stub = Arc::new(Stub {
        groups: vec![BudgetCategoryGroup {
            id: "bills".to_string(),
            name: "Bills".to_string(),
            is_income: false,
            hidden: false,
            budgeted: 1000,
            spent: -400,
            balance: 999,
            categories: vec![BudgetCategory {
                id: "rent".to_string(),
                name: "Rent".to_string(),
                budgeted: 1000,
                spent: -400,
                balance: 600,
                carryover: false,
            }],
        }],
        ..Stub::default()
    });
    let log = log();
    let orchestrator = Orchestrator::new(stub, Arc::clone(&log), 4);

    let month = MonthKey::new(2024, 3).unwrap();
    let view = orchestrator.budget_month(month).await.unwrap();

    assert_eq!(view.summary.month, month);
    assert_eq!(view.rollup.groups[0].balance, 600);
    let records = log.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context.as_deref(), Some("rollup.mismatch"));
    assert_eq!(records[0].metadata["figure"], "balance");
}

#[tokio::test]
async fn snapshot_over_demo_backend_is_sorted_and_complete() {
    let demo = DemoClient::builder()
        .seed(99)
        .today(date("2024-03-31"))
        .build();
    let orchestrator = Orchestrator::new(Arc::new(demo), log(), 3);

    let snapshot = orchestrator.load_snapshot(date("2024-03-01")).await.unwrap();

    assert_eq!(snapshot.accounts.len(), 5);
    assert!(!snapshot.payees.is_empty());
    assert!(snapshot.transactions.len() >= 5 * 20);
    assert!(
        snapshot
            .transactions
            .windows(2)
            .all(|w| w[0].date >= w[1].date)
    );
    for account in &snapshot.accounts {
        assert!(snapshot.transactions.iter().any(|t| t.account == account.id));
    }

    let dashboard = engine::Dashboard::build(&snapshot, date("2024-03-31"));
    assert!(dashboard.top_categories.len() <= engine::TOP_CATEGORIES);
    assert!(dashboard.spent_this_month >= dashboard.spent_today);
}
