//! Offline backend generating a plausible budget on the fly.
//!
//! Reference data is a fixed catalogue. Transactions are drawn fresh on every
//! call; budget months come from a per-month seed so both month endpoints agree.

use std::sync::{Mutex, PoisonError};

use api_types::{
    MonthKey,
    account::Account,
    budget::{BudgetCategory, BudgetCategoryGroup, BudgetMonth},
    category::{Category, CategoryGroup},
    payee::Payee,
    transaction::{Transaction, TransactionQuery},
};
use async_trait::async_trait;
use chrono::{Datelike, Days, Local, NaiveDate};
use engine::sort_newest_first;
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::{BudgetApi, error::Result};

/// `(id, name, offbudget)`
const ACCOUNTS: &[(&str, &str, bool)] = &[
    ("demo-checking", "Checking", false),
    ("demo-savings", "Savings", false),
    ("demo-credit-card", "Credit Card", false),
    ("demo-brokerage", "Brokerage", true),
    ("demo-mortgage", "Mortgage", true),
];

/// Transfers always start from one of these.
const ON_BUDGET: &[(&str, &str, bool)] = &[
    ("demo-checking", "Checking", false),
    ("demo-savings", "Savings", false),
    ("demo-credit-card", "Credit Card", false),
];

const EXPENSE_GROUP: (&str, &str) = ("demo-group-expenses", "Everyday Expenses");
const INCOME_GROUP: (&str, &str) = ("demo-group-income", "Income");

/// `(category id, category name, payee name)`
const EXPENSES: &[(&str, &str, &str)] = &[
    ("demo-cat-groceries", "Groceries", "Corner Market"),
    ("demo-cat-rent", "Rent", "Oak Street Lettings"),
    ("demo-cat-utilities", "Utilities", "City Power & Water"),
    ("demo-cat-dining", "Dining Out", "Luigi's Trattoria"),
    ("demo-cat-transport", "Transport", "Metro Transit"),
    ("demo-cat-entertainment", "Entertainment", "Cinema Paradiso"),
    ("demo-cat-health", "Health", "Green Cross Pharmacy"),
];

const INCOME: &[(&str, &str, &str)] = &[
    ("demo-cat-salary", "Salary", "Acme Corp Payroll"),
    ("demo-cat-interest", "Interest", "First Savings Bank"),
];

const MIN_TRANSACTIONS: usize = 20;
const MAX_TRANSACTIONS: usize = 50;
const DEFAULT_LOOKBACK_DAYS: u64 = 30;
const MAX_TRANSFERS: u64 = 8;

#[derive(Debug, Default)]
pub struct DemoClientBuilder {
    seed: Option<u64>,
    today: Option<NaiveDate>,
}

impl DemoClientBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Upper bound for generated dates. Defaults to the local date.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn build(self) -> DemoClient {
        let seed = self.seed.unwrap_or_else(rand::random);
        DemoClient {
            seed,
            today: self.today.unwrap_or_else(|| Local::now().date_naive()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

/// [`BudgetApi`] that never touches the network. Mutations succeed and change nothing.
#[derive(Debug)]
pub struct DemoClient {
    seed: u64,
    today: NaiveDate,
    rng: Mutex<StdRng>,
}

impl DemoClient {
    pub fn builder() -> DemoClientBuilder {
        DemoClientBuilder::default()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    fn seeded(&self, salt: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn generate(&self, account_id: &str, query: TransactionQuery) -> Vec<Transaction> {
        let since = query.since.unwrap_or_else(|| {
            self.today
                .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
                .unwrap_or(NaiveDate::MIN)
        });
        let until = query.until.map_or(self.today, |until| until.min(self.today));
        if since > until {
            return Vec::new();
        }
        let span = u64::try_from((until - since).num_days()).unwrap_or(0);
        let offbudget = is_offbudget(account_id);
        let outflow_probability = if offbudget { 0.3 } else { 0.8 };

        let mut transactions = self.transfer_legs(account_id, since, span);

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let count = rng.gen_range(MIN_TRANSACTIONS..=MAX_TRANSACTIONS);
        for _ in transactions.len()..count {
            let date = since
                .checked_add_days(Days::new(rng.gen_range(0..=span)))
                .unwrap_or(until);
            let (category, amount) = if rng.gen_bool(outflow_probability) {
                let (category, ..) = EXPENSES[rng.gen_range(0..EXPENSES.len())];
                (category, -rng.gen_range(300..=15_000))
            } else {
                let (category, ..) = INCOME[rng.gen_range(0..INCOME.len())];
                (category, rng.gen_range(1_000..=300_000))
            };
            transactions.push(Transaction {
                id: Some(random_id(&mut rng)),
                account: account_id.to_string(),
                date,
                amount: Some(amount),
                payee: Some(payee_id(category)),
                category: Some(category.to_string()),
                cleared: Some(rng.gen_bool(0.7)),
                ..Transaction::default()
            });
        }
        drop(rng);

        sort_newest_first(&mut transactions);
        paginate(transactions, query)
    }

    /// Legs touching `account_id` of the transfers scheduled in the window.
    ///
    /// The schedule depends only on the seed and the window, so fetching
    /// every account with the same query yields both legs of each transfer,
    /// linked through `transfer_id`.
    fn transfer_legs(&self, account_id: &str, since: NaiveDate, span: u64) -> Vec<Transaction> {
        let salt = (u64::from(since.num_days_from_ce().unsigned_abs()) << 20) ^ span;
        let mut rng = self.seeded(salt);
        let scheduled = ((span + 1) / 7).min(MAX_TRANSFERS);

        let mut legs = Vec::new();
        for _ in 0..scheduled {
            let (from, ..) = ON_BUDGET[rng.gen_range(0..ON_BUDGET.len())];
            let (to, ..) = pick_other_account(&mut rng, from);
            let date = since
                .checked_add_days(Days::new(rng.gen_range(0..=span)))
                .unwrap_or(since);
            let amount = rng.gen_range(2_000..=50_000);
            let out_id = random_id(&mut rng);
            let in_id = random_id(&mut rng);

            let leg = |account: &str, counterpart: &str, id: &str, linked: &str, amount: i64| {
                Transaction {
                    id: Some(id.to_string()),
                    account: account.to_string(),
                    date,
                    amount: Some(amount),
                    payee: Some(transfer_payee_id(counterpart)),
                    transfer_id: Some(linked.to_string()),
                    cleared: Some(true),
                    ..Transaction::default()
                }
            };
            if from == account_id {
                legs.push(leg(from, to, &out_id, &in_id, -amount));
            }
            if to == account_id {
                legs.push(leg(to, from, &in_id, &out_id, amount));
            }
        }
        legs
    }

    fn month_groups(&self, month: MonthKey) -> Vec<BudgetCategoryGroup> {
        let salt = (month.year() as u64) * 12 + u64::from(month.month());
        let mut rng = self.seeded(salt);

        let expenses: Vec<BudgetCategory> = EXPENSES
            .iter()
            .map(|(id, name, _)| {
                let budgeted = rng.gen_range(50..=800) * 100;
                // Roughly one category in ten runs over budget.
                let spent = -rng.gen_range(0..=budgeted + budgeted / 10);
                budget_category(id, name, budgeted, spent)
            })
            .collect();
        let income: Vec<BudgetCategory> = INCOME
            .iter()
            .map(|(id, name, _)| {
                let received = rng.gen_range(0..=400_000);
                budget_category(id, name, 0, received)
            })
            .collect();

        vec![
            budget_group(EXPENSE_GROUP, false, expenses),
            budget_group(INCOME_GROUP, true, income),
        ]
    }
}

fn random_id(rng: &mut StdRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

fn is_offbudget(account_id: &str) -> bool {
    ACCOUNTS
        .iter()
        .any(|(id, _, offbudget)| *id == account_id && *offbudget)
}

fn pick_other_account(rng: &mut StdRng, account_id: &str) -> (&'static str, &'static str, bool) {
    let others: Vec<_> = ACCOUNTS.iter().filter(|(id, ..)| *id != account_id).collect();
    *others[rng.gen_range(0..others.len())]
}

fn payee_id(category_id: &str) -> String {
    category_id.replacen("demo-cat-", "demo-payee-", 1)
}

fn transfer_payee_id(account_id: &str) -> String {
    format!("demo-transfer-{account_id}")
}

/// Applies 1-based `page` and `limit`; `page` without `limit` is ignored.
fn paginate(transactions: Vec<Transaction>, query: TransactionQuery) -> Vec<Transaction> {
    let Some(limit) = query.limit else {
        return transactions;
    };
    let limit = limit as usize;
    let page = query.page.unwrap_or(1).max(1) as usize;
    transactions
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect()
}

fn budget_category(id: &str, name: &str, budgeted: i64, spent: i64) -> BudgetCategory {
    BudgetCategory {
        id: id.to_string(),
        name: name.to_string(),
        budgeted,
        spent,
        balance: budgeted + spent,
        carryover: false,
    }
}

fn budget_group(
    (id, name): (&str, &str),
    is_income: bool,
    categories: Vec<BudgetCategory>,
) -> BudgetCategoryGroup {
    BudgetCategoryGroup {
        id: id.to_string(),
        name: name.to_string(),
        is_income,
        hidden: false,
        budgeted: categories.iter().map(|c| c.budgeted).sum(),
        spent: categories.iter().map(|c| c.spent).sum(),
        balance: categories.iter().map(|c| c.balance).sum(),
        categories,
    }
}

fn catalogue_groups() -> Vec<CategoryGroup> {
    let group = |(id, name): (&str, &str), is_income: bool, entries: &[(&str, &str, &str)]| {
        CategoryGroup {
            id: id.to_string(),
            name: name.to_string(),
            is_income: Some(is_income),
            hidden: Some(false),
            categories: entries
                .iter()
                .map(|(category, category_name, _)| Category {
                    id: category.to_string(),
                    name: category_name.to_string(),
                    is_income: Some(is_income),
                    hidden: Some(false),
                    group_id: Some(id.to_string()),
                })
                .collect(),
        }
    };
    vec![
        group(EXPENSE_GROUP, false, EXPENSES),
        group(INCOME_GROUP, true, INCOME),
    ]
}

#[async_trait]
impl BudgetApi for DemoClient {
    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        Ok(ACCOUNTS
            .iter()
            .map(|(id, name, offbudget)| Account {
                id: id.to_string(),
                name: name.to_string(),
                offbudget: *offbudget,
                closed: false,
            })
            .collect())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        Ok(catalogue_groups()
            .into_iter()
            .flat_map(|g| g.categories)
            .collect())
    }

    async fn fetch_category_groups(&self) -> Result<Vec<CategoryGroup>> {
        Ok(catalogue_groups())
    }

    async fn fetch_payees(&self) -> Result<Vec<Payee>> {
        let regular = EXPENSES
            .iter()
            .chain(INCOME)
            .map(|(category, _, name)| Payee {
                id: payee_id(category),
                name: name.to_string(),
                category: Some(category.to_string()),
                transfer_account: None,
            });
        let transfers = ACCOUNTS.iter().map(|(id, name, _)| Payee {
            id: transfer_payee_id(id),
            name: format!("Transfer: {name}"),
            category: None,
            transfer_account: Some(id.to_string()),
        });
        Ok(regular.chain(transfers).collect())
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        Ok(self.generate(account_id, query))
    }

    async fn fetch_account_balance(
        &self,
        account_id: &str,
        _cutoff: Option<NaiveDate>,
    ) -> Result<i64> {
        let salt = account_id
            .bytes()
            .fold(0u64, |hash, b| hash.wrapping_mul(31).wrapping_add(u64::from(b)));
        let mut rng = self.seeded(salt);
        let magnitude = rng.gen_range(10_000..=5_000_000);
        Ok(if account_id == "demo-mortgage" {
            -magnitude * 20
        } else {
            magnitude
        })
    }

    async fn create_transaction(&self, _account_id: &str, _transaction: &Transaction) -> Result<()> {
        Ok(())
    }

    async fn update_transaction(&self, _id: &str, _transaction: &Transaction) -> Result<()> {
        Ok(())
    }

    async fn delete_transaction(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_budget_month(&self, month: MonthKey) -> Result<BudgetMonth> {
        let groups = self.month_groups(month);
        let (expenses, income): (Vec<_>, Vec<_>) = groups.iter().partition(|g| !g.is_income);
        let total_budgeted: i64 = expenses.iter().map(|g| g.budgeted).sum();
        let total_spent: i64 = expenses.iter().map(|g| g.spent).sum();
        let total_balance: i64 = expenses.iter().map(|g| g.balance).sum();
        let total_income: i64 = income.iter().map(|g| g.spent).sum();
        let from_last_month = self.seeded(month.year() as u64).gen_range(0..=50_000);
        let income_available = total_income + from_last_month;

        Ok(BudgetMonth {
            month,
            income_available,
            last_month_overspent: 0,
            for_next_month: 0,
            total_budgeted,
            to_budget: income_available - total_budgeted,
            from_last_month,
            total_income,
            total_spent,
            total_balance,
        })
    }

    async fn fetch_budget_category_groups(
        &self,
        month: MonthKey,
    ) -> Result<Vec<BudgetCategoryGroup>> {
        Ok(self.month_groups(month))
    }

    async fn create_account(&self, _name: &str, _offbudget: bool) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn close_account(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn reopen_account(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_account(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn bank_sync(&self, _account_id: Option<&str>) -> Result<()> {
        Ok(())
    }
}
