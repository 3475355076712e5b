//! Budget-month category groups, rechecked on read.
//!
//! Server figures are not trusted as-is: every category must satisfy
//! `balance == budgeted + spent` and every group must equal the sum of its
//! categories. Disagreements are recomputed and reported back so the caller
//! can log them.

use api_types::budget::{BudgetCategory, BudgetCategoryGroup};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Figure {
    Budgeted,
    Spent,
    Balance,
}

/// A server figure that did not match the recomputed one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RollupMismatch {
    pub group_id: String,
    /// `None` when the mismatch is on the group totals.
    pub category_id: Option<String>,
    pub figure: Figure,
    pub reported: i64,
    pub expected: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetRollup {
    /// Expense groups first, income groups last; otherwise server order.
    pub groups: Vec<BudgetCategoryGroup>,
    pub mismatches: Vec<RollupMismatch>,
}

impl BudgetRollup {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn check(
    mismatches: &mut Vec<RollupMismatch>,
    group_id: &str,
    category_id: Option<&str>,
    figure: Figure,
    reported: &mut i64,
    expected: i64,
) {
    if *reported != expected {
        mismatches.push(RollupMismatch {
            group_id: group_id.to_string(),
            category_id: category_id.map(str::to_string),
            figure,
            reported: *reported,
            expected,
        });
        *reported = expected;
    }
}

fn settle_category(
    mismatches: &mut Vec<RollupMismatch>,
    group_id: &str,
    category: &mut BudgetCategory,
) {
    let expected = category.budgeted.saturating_add(category.spent);
    check(
        mismatches,
        group_id,
        Some(&category.id),
        Figure::Balance,
        &mut category.balance,
        expected,
    );
}

pub fn rollup(mut groups: Vec<BudgetCategoryGroup>) -> BudgetRollup {
    let mut mismatches = Vec::new();

    for group in &mut groups {
        for category in &mut group.categories {
            settle_category(&mut mismatches, &group.id, category);
        }

        let sum = |pick: fn(&BudgetCategory) -> i64| {
            group
                .categories
                .iter()
                .map(pick)
                .fold(0i64, i64::saturating_add)
        };
        let budgeted = sum(|c| c.budgeted);
        let spent = sum(|c| c.spent);
        let balance = sum(|c| c.balance);

        check(&mut mismatches, &group.id, None, Figure::Budgeted, &mut group.budgeted, budgeted);
        check(&mut mismatches, &group.id, None, Figure::Spent, &mut group.spent, spent);
        check(&mut mismatches, &group.id, None, Figure::Balance, &mut group.balance, balance);
    }

    // Stable: keeps server order within each half.
    groups.sort_by_key(|g| g.is_income);

    BudgetRollup { groups, mismatches }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, budgeted: i64, spent: i64, balance: i64) -> BudgetCategory {
        BudgetCategory {
            id: id.to_string(),
            name: id.to_string(),
            budgeted,
            spent,
            balance,
            carryover: false,
        }
    }

    fn group(id: &str, is_income: bool, categories: Vec<BudgetCategory>) -> BudgetCategoryGroup {
        let budgeted = categories.iter().map(|c| c.budgeted).sum();
        let spent = categories.iter().map(|c| c.spent).sum();
        let balance = categories.iter().map(|c| c.balance).sum();
        BudgetCategoryGroup {
            id: id.to_string(),
            name: id.to_string(),
            is_income,
            hidden: false,
            budgeted,
            spent,
            balance,
            categories,
        }
    }

    #[test]
    fn consistent_groups_pass_untouched() {
        let groups = vec![group(
            "bills",
            false,
            vec![category("rent", 1000, -1000, 0), category("power", 200, -150, 50)],
        )];
        let result = rollup(groups.clone());
        assert!(result.is_consistent());
        assert_eq!(result.groups, groups);
    }

    #[test]
    fn income_groups_sort_last_preserving_order() {
        let result = rollup(vec![
            group("income", true, vec![]),
            group("bills", false, vec![]),
            group("fun", false, vec![]),
        ]);
        let order: Vec<_> = result.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["bills", "fun", "income"]);
    }

    #[test]
    fn group_totals_are_recomputed_from_categories() {
        let mut bad = group("bills", false, vec![category("rent", 1000, -400, 600)]);
        bad.spent = -999;
        bad.balance = 1;

        let result = rollup(vec![bad]);
        let g = &result.groups[0];
        assert_eq!((g.budgeted, g.spent, g.balance), (1000, -400, 600));
        assert_eq!(result.mismatches.len(), 2);
        assert_eq!(result.mismatches[0].figure, Figure::Spent);
        assert_eq!(result.mismatches[0].reported, -999);
        assert_eq!(result.mismatches[0].expected, -400);
    }

    #[test]
    fn category_balance_invariant_is_enforced() {
        let result = rollup(vec![group(
            "bills",
            false,
            vec![category("rent", 1000, -400, 700)],
        )]);

        let c = &result.groups[0].categories[0];
        assert_eq!(c.balance, c.budgeted + c.spent);
        assert_eq!(result.groups[0].balance, 600);
        assert_eq!(
            result.mismatches[0],
            RollupMismatch {
                group_id: "bills".to_string(),
                category_id: Some("rent".to_string()),
                figure: Figure::Balance,
                reported: 700,
                expected: 600,
            }
        );
    }
}
