//! Plain-text rendering of fetched and aggregated data.

use api_types::transaction::Transaction;
use budget_client::{AccountBalance, BudgetMonthView};
use engine::{Currency, Dashboard, Money, Snapshot};

const UNCATEGORIZED: &str = "Uncategorized";

fn amount(minor: i64, currency: Currency) -> String {
    format!("{:>14}", Money::new(minor, currency).to_string())
}

pub fn dashboard(dashboard: &Dashboard, snapshot: &Snapshot, currency: Currency) -> String {
    let mut lines = vec![
        format!("Dashboard for {}", dashboard.today),
        format!("  spent today        {}", amount(dashboard.spent_today, currency)),
        format!("  spent this month   {}", amount(dashboard.spent_this_month, currency)),
        format!("  spent last month   {}", amount(dashboard.spent_last_month, currency)),
        format!("  income this month  {}", amount(dashboard.income_this_month, currency)),
        String::new(),
        "Daily spend".to_string(),
    ];
    if dashboard.daily.is_empty() {
        lines.push("  (nothing spent this month)".to_string());
    }
    for day in &dashboard.daily {
        lines.push(format!("  {}         {}", day.date, amount(day.amount, currency)));
    }

    lines.push(String::new());
    lines.push("Top categories".to_string());
    for bucket in &dashboard.top_categories {
        let name = bucket
            .category
            .as_deref()
            .map(|id| snapshot.category_name(id).unwrap_or(id))
            .unwrap_or(UNCATEGORIZED);
        lines.push(format!("  {name:<18} {}", amount(bucket.amount, currency)));
    }
    lines.join("\n")
}

pub fn accounts(rows: &[AccountBalance], currency: Currency) -> String {
    rows.iter()
        .map(|row| {
            let balance = row
                .balance
                .map_or_else(|| format!("{:>14}", "unavailable"), |b| amount(b, currency));
            let mut flags = Vec::new();
            if row.account.offbudget {
                flags.push("off-budget");
            }
            if row.account.closed {
                flags.push("closed");
            }
            format!("{:<24} {balance}  {}", row.account.name, flags.join(", "))
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn budget(view: &BudgetMonthView, currency: Currency) -> String {
    let summary = &view.summary;
    let mut lines = vec![
        format!("Budget {}", summary.month),
        format!("  to budget          {}", amount(summary.to_budget, currency)),
        format!("  total budgeted     {}", amount(summary.total_budgeted, currency)),
        format!("  total spent        {}", amount(summary.total_spent, currency)),
        format!("  total income       {}", amount(summary.total_income, currency)),
        String::new(),
        format!(
            "{:<26} {:>14} {:>14} {:>14}",
            "", "budgeted", "spent", "balance"
        ),
    ];
    for group in view.rollup.groups.iter().filter(|g| !g.hidden) {
        lines.push(format!(
            "{:<26} {} {} {}",
            group.name,
            amount(group.budgeted, currency),
            amount(group.spent, currency),
            amount(group.balance, currency)
        ));
        for category in &group.categories {
            lines.push(format!(
                "  {:<24} {} {} {}",
                category.name,
                amount(category.budgeted, currency),
                amount(category.spent, currency),
                amount(category.balance, currency)
            ));
        }
    }
    if !view.rollup.is_consistent() {
        lines.push(String::new());
        lines.push(format!(
            "{} server figure(s) were recomputed; see the diagnostic log.",
            view.rollup.mismatches.len()
        ));
    }
    lines.join("\n")
}

pub fn transactions(list: &[&Transaction], snapshot: &Snapshot, currency: Currency) -> String {
    if list.is_empty() {
        return "No transactions in this window.".to_string();
    }
    list.iter()
        .map(|tx| {
            let account = snapshot.account_name(&tx.account).unwrap_or(&tx.account);
            let payee = tx
                .payee
                .as_deref()
                .and_then(|id| snapshot.payees.iter().find(|p| p.id == id))
                .map(|p| p.name.as_str())
                .or(tx.payee_name.as_deref())
                .unwrap_or("");
            let category = match tx.splits() {
                [] => tx
                    .category
                    .as_deref()
                    .map(|id| snapshot.category_name(id).unwrap_or(id))
                    .unwrap_or(UNCATEGORIZED),
                _ => "Split",
            };
            format!(
                "{}  {:<16} {:<24} {:<16} {}",
                tx.date,
                account,
                payee,
                category,
                amount(tx.amount_or_zero(), currency)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
