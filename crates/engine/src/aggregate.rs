//! Dashboard figures computed from a snapshot.
//!
//! "Spent" is the negated sum of outflows on on-budget accounts, leaving out
//! internal transfers (see [`crate::classify`]). Inflows never reduce spend:
//! refunds and income are reported separately.

use std::collections::{BTreeMap, HashMap};

use api_types::{MonthKey, transaction::Transaction};
use chrono::NaiveDate;
use serde::Serialize;

use crate::{Classifier, Snapshot, window::DateRange};

/// How many categories the dashboard shows.
pub const TOP_CATEGORIES: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySpend {
    pub date: NaiveDate,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorySpend {
    /// `None` collects uncategorized spend.
    pub category: Option<String>,
    pub amount: i64,
}

fn outflows<'t>(
    classifier: &'t Classifier<'_>,
    transactions: &'t [Transaction],
    range: DateRange,
) -> impl Iterator<Item = &'t Transaction> {
    transactions.iter().filter(move |tx| {
        range.contains(tx.date) && tx.amount_or_zero() < 0 && classifier.counts_toward_budget(tx)
    })
}

/// Money spent inside `range`. Always `>= 0`.
pub fn spent(classifier: &Classifier<'_>, transactions: &[Transaction], range: DateRange) -> i64 {
    outflows(classifier, transactions, range)
        .map(|tx| tx.amount_or_zero().saturating_neg())
        .fold(0i64, i64::saturating_add)
}

/// Money received inside `range`. Always `>= 0`.
pub fn income(classifier: &Classifier<'_>, transactions: &[Transaction], range: DateRange) -> i64 {
    transactions
        .iter()
        .filter(|tx| {
            range.contains(tx.date)
                && tx.amount_or_zero() > 0
                && classifier.counts_toward_budget(tx)
        })
        .map(Transaction::amount_or_zero)
        .fold(0i64, i64::saturating_add)
}

/// Per-day spend for the month containing `today`, oldest day first.
/// Days without spend are left out.
pub fn daily_spend(
    classifier: &Classifier<'_>,
    transactions: &[Transaction],
    today: NaiveDate,
) -> Vec<DaySpend> {
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for tx in outflows(classifier, transactions, DateRange::month(MonthKey::of(today))) {
        let total = days.entry(tx.date).or_default();
        *total = total.saturating_add(tx.amount_or_zero().saturating_neg());
    }
    days.into_iter()
        .map(|(date, amount)| DaySpend { date, amount })
        .collect()
}

/// Largest spend categories for the month containing `today`.
///
/// Split transactions are bucketed by their children's categories. Result is
/// sorted by amount descending (ties by category id) and cut to `limit`.
pub fn top_categories(
    classifier: &Classifier<'_>,
    transactions: &[Transaction],
    today: NaiveDate,
    limit: usize,
) -> Vec<CategorySpend> {
    let mut buckets: HashMap<Option<&str>, i64> = HashMap::new();
    let mut add = |category, amount: i64| {
        let total = buckets.entry(category).or_default();
        *total = total.saturating_add(amount.saturating_neg());
    };

    for tx in outflows(classifier, transactions, DateRange::month(MonthKey::of(today))) {
        if tx.splits().is_empty() {
            add(tx.category.as_deref(), tx.amount_or_zero());
            continue;
        }
        for split in tx.splits().iter().filter(|s| s.amount < 0) {
            add(split.category.as_deref(), split.amount);
        }
    }

    let mut ranked: Vec<CategorySpend> = buckets
        .into_iter()
        .map(|(category, amount)| CategorySpend {
            category: category.map(str::to_string),
            amount,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(limit);
    ranked
}

/// Everything the dashboard view needs, computed in one pass over a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub spent_today: i64,
    pub spent_this_month: i64,
    pub spent_last_month: i64,
    pub income_this_month: i64,
    pub daily: Vec<DaySpend>,
    pub top_categories: Vec<CategorySpend>,
}

impl Dashboard {
    pub fn build(snapshot: &Snapshot, today: NaiveDate) -> Self {
        let classifier = snapshot.classifier();
        let txs = &snapshot.transactions;
        let this_month = MonthKey::of(today);

        Self {
            today,
            spent_today: spent(&classifier, txs, DateRange::day(today)),
            spent_this_month: spent(&classifier, txs, DateRange::month(this_month)),
            spent_last_month: spent(&classifier, txs, DateRange::month(this_month.previous())),
            income_this_month: income(&classifier, txs, DateRange::month(this_month)),
            daily: daily_spend(&classifier, txs, today),
            top_categories: top_categories(&classifier, txs, today, TOP_CATEGORIES),
        }
    }
}

#[cfg(test)]
mod tests {
    use api_types::{
        account::Account,
        payee::Payee,
        transaction::SubTransaction,
    };

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(id: &str, offbudget: bool) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            offbudget,
            closed: false,
        }
    }

    fn tx(account: &str, on: NaiveDate, amount: i64, category: Option<&str>) -> Transaction {
        Transaction {
            account: account.to_string(),
            date: on,
            amount: Some(amount),
            category: category.map(str::to_string),
            ..Transaction::default()
        }
    }

    fn snapshot(transactions: Vec<Transaction>) -> Snapshot {
        Snapshot {
            accounts: vec![account("A", false), account("B", true), account("C", false)],
            categories: Vec::new(),
            payees: vec![
                Payee {
                    id: "P1".to_string(),
                    name: "Transfer: B".to_string(),
                    category: None,
                    transfer_account: Some("B".to_string()),
                },
                Payee {
                    id: "toC".to_string(),
                    name: "Transfer: C".to_string(),
                    category: None,
                    transfer_account: Some("C".to_string()),
                },
            ],
            transactions,
        }
    }

    #[test]
    fn transfer_to_off_budget_account_counts_as_spend() {
        let today = date(2024, 3, 20);
        let mut t = tx("A", date(2024, 3, 5), -500, None);
        t.payee = Some("P1".to_string());
        let snap = snapshot(vec![t]);

        let dashboard = Dashboard::build(&snap, today);
        assert_eq!(dashboard.spent_this_month, 500);
    }

    #[test]
    fn internal_transfers_and_off_budget_accounts_are_excluded() {
        let today = date(2024, 3, 20);
        let mut internal = tx("A", date(2024, 3, 5), -700, None);
        internal.payee = Some("toC".to_string());
        let snap = snapshot(vec![
            internal,
            tx("B", date(2024, 3, 5), -900, None),
            tx("A", date(2024, 3, 6), -100, Some("food")),
        ]);

        let dashboard = Dashboard::build(&snap, today);
        assert_eq!(dashboard.spent_this_month, 100);
    }

    #[test]
    fn spend_ignores_inflows_and_is_idempotent() {
        let today = date(2024, 3, 20);
        let snap = snapshot(vec![
            tx("A", date(2024, 3, 20), -250, Some("food")),
            tx("A", date(2024, 3, 20), 1000, Some("salary")),
            tx("A", date(2024, 2, 29), -400, Some("rent")),
            tx("A", date(2024, 1, 31), -999, Some("rent")),
        ]);

        let first = Dashboard::build(&snap, today);
        let second = Dashboard::build(&snap, today);
        assert_eq!(first, second);
        assert_eq!(first.spent_today, 250);
        assert_eq!(first.spent_this_month, 250);
        assert_eq!(first.spent_last_month, 400);
        assert_eq!(first.income_this_month, 1000);
    }

    #[test]
    fn daily_buckets_cover_the_current_month_in_order() {
        let today = date(2024, 3, 20);
        let snap = snapshot(vec![
            tx("A", date(2024, 3, 3), -100, None),
            tx("A", date(2024, 3, 1), -50, None),
            tx("A", date(2024, 3, 3), -25, None),
            tx("A", date(2024, 2, 28), -999, None),
        ]);
        let classifier = snap.classifier();

        let daily = daily_spend(&classifier, &snap.transactions, today);
        assert_eq!(
            daily,
            vec![
                DaySpend {
                    date: date(2024, 3, 1),
                    amount: 50
                },
                DaySpend {
                    date: date(2024, 3, 3),
                    amount: 125
                },
            ]
        );
    }

    #[test]
    fn top_categories_keeps_six_largest() {
        let today = date(2024, 3, 20);
        let txs = (1..=8)
            .map(|i| tx("A", date(2024, 3, 2), -100 * i, Some(&format!("c{i}"))))
            .collect();
        let snap = snapshot(txs);
        let classifier = snap.classifier();

        let top = top_categories(&classifier, &snap.transactions, today, TOP_CATEGORIES);
        assert_eq!(top.len(), 6);
        assert_eq!(top[0].category.as_deref(), Some("c8"));
        assert_eq!(top[0].amount, 800);
        assert_eq!(top[5].category.as_deref(), Some("c3"));
        assert!(top.windows(2).all(|w| w[0].amount >= w[1].amount));
    }

    #[test]
    fn split_transactions_bucket_by_child_category() {
        let today = date(2024, 3, 20);
        let mut parent = tx("A", date(2024, 3, 2), -300, None);
        parent.subtransactions = Some(vec![
            SubTransaction {
                amount: -200,
                category: Some("food".to_string()),
                ..SubTransaction::default()
            },
            SubTransaction {
                amount: -100,
                category: Some("home".to_string()),
                ..SubTransaction::default()
            },
        ]);
        let snap = snapshot(vec![parent, tx("A", date(2024, 3, 4), -50, None)]);
        let classifier = snap.classifier();

        let top = top_categories(&classifier, &snap.transactions, today, TOP_CATEGORIES);
        assert_eq!(
            top,
            vec![
                CategorySpend {
                    category: Some("food".to_string()),
                    amount: 200
                },
                CategorySpend {
                    category: Some("home".to_string()),
                    amount: 100
                },
                CategorySpend {
                    category: None,
                    amount: 50
                },
            ]
        );
    }
}
