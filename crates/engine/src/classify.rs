//! Transfer detection over a fetched snapshot.
//!
//! A transaction is a transfer when it carries a `transfer_id`, or when its
//! payee is a transfer payee (one with `transfer_acct` set). Transfers whose
//! destination is an on-budget account are *internal*: they only move money
//! around inside the budget and are kept out of spend and income totals.
//!
//! Each leg is judged by its own destination. For a pair between two
//! on-budget accounts both legs are internal, so neither shows up in totals.
//! A leg whose destination is off-budget or cannot be resolved is *external*
//! and still counts.

use std::collections::HashMap;

use api_types::{account::Account, payee::Payee, transaction::Transaction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferKind {
    NotTransfer,
    /// Destination is an on-budget account.
    Internal,
    /// Destination is off-budget or unknown.
    External,
}

impl TransferKind {
    pub fn is_transfer(self) -> bool {
        !matches!(self, Self::NotTransfer)
    }
}

/// Id indexes over accounts, payees and (optionally) transactions.
#[derive(Debug, Default)]
pub struct Classifier<'a> {
    accounts: HashMap<&'a str, &'a Account>,
    payees: HashMap<&'a str, &'a Payee>,
    transactions: HashMap<&'a str, &'a Transaction>,
}

impl<'a> Classifier<'a> {
    pub fn new(accounts: &'a [Account], payees: &'a [Payee]) -> Self {
        Self {
            accounts: accounts.iter().map(|a| (a.id.as_str(), a)).collect(),
            payees: payees.iter().map(|p| (p.id.as_str(), p)).collect(),
            transactions: HashMap::new(),
        }
    }

    /// Index transactions so a `transfer_id` can be followed to the other leg.
    pub fn with_transactions(mut self, transactions: &'a [Transaction]) -> Self {
        self.transactions = transactions
            .iter()
            .filter_map(|tx| tx.id.as_deref().map(|id| (id, tx)))
            .collect();
        self
    }

    pub fn account(&self, id: &str) -> Option<&'a Account> {
        self.accounts.get(id).copied()
    }

    /// Unknown accounts are treated as off-budget.
    pub fn is_on_budget(&self, account_id: &str) -> bool {
        self.account(account_id).is_some_and(|a| !a.offbudget)
    }

    fn transfer_payee(&self, tx: &Transaction) -> Option<&'a Payee> {
        let payee = self.payees.get(tx.payee.as_deref()?).copied()?;
        payee.transfer_account.is_some().then_some(payee)
    }

    pub fn is_transfer(&self, tx: &Transaction) -> bool {
        tx.transfer_id.is_some() || self.transfer_payee(tx).is_some()
    }

    /// Account on the other side of a transfer, if it can be resolved.
    ///
    /// The transfer payee wins; otherwise the counterpart transaction named
    /// by `transfer_id` is looked up in the indexed transactions.
    pub fn transfer_destination(&self, tx: &Transaction) -> Option<&'a str> {
        if let Some(account) = self
            .transfer_payee(tx)
            .and_then(|p| p.transfer_account.as_deref())
        {
            return Some(account);
        }
        let other = self.transactions.get(tx.transfer_id.as_deref()?).copied()?;
        (other.account != tx.account).then_some(other.account.as_str())
    }

    pub fn transfer_kind(&self, tx: &Transaction) -> TransferKind {
        if !self.is_transfer(tx) {
            return TransferKind::NotTransfer;
        }
        match self.transfer_destination(tx) {
            Some(destination) if self.is_on_budget(destination) => TransferKind::Internal,
            _ => TransferKind::External,
        }
    }

    /// Whether the transaction contributes to on-budget spend/income totals.
    pub fn counts_toward_budget(&self, tx: &Transaction) -> bool {
        self.is_on_budget(&tx.account) && self.transfer_kind(tx) != TransferKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn account(id: &str, offbudget: bool) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            offbudget,
            closed: false,
        }
    }

    fn transfer_payee(id: &str, to: &str) -> Payee {
        Payee {
            id: id.to_string(),
            name: format!("Transfer: {to}"),
            category: None,
            transfer_account: Some(to.to_string()),
        }
    }

    fn tx(account: &str, amount: i64) -> Transaction {
        Transaction {
            account: account.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            amount: Some(amount),
            ..Transaction::default()
        }
    }

    #[test]
    fn transfer_id_alone_marks_a_transfer() {
        let accounts = [account("A", false)];
        let classifier = Classifier::new(&accounts, &[]);
        let mut t = tx("A", -100);
        t.transfer_id = Some("other-leg".to_string());
        assert!(classifier.is_transfer(&t));
        assert_eq!(classifier.transfer_kind(&t), TransferKind::External);
    }

    #[test]
    fn transfer_to_off_budget_account_is_external() {
        let accounts = [account("A", false), account("B", true)];
        let payees = [transfer_payee("P1", "B")];
        let classifier = Classifier::new(&accounts, &payees);
        let mut t = tx("A", -500);
        t.payee = Some("P1".to_string());

        assert!(classifier.is_transfer(&t));
        assert_eq!(classifier.transfer_kind(&t), TransferKind::External);
        assert!(classifier.counts_toward_budget(&t));
    }

    #[test]
    fn transfer_between_on_budget_accounts_is_internal_on_both_legs() {
        let accounts = [account("A", false), account("C", false)];
        let payees = [transfer_payee("toC", "C"), transfer_payee("toA", "A")];
        let classifier = Classifier::new(&accounts, &payees);

        let mut out = tx("A", -500);
        out.payee = Some("toC".to_string());
        let mut inflow = tx("C", 500);
        inflow.payee = Some("toA".to_string());

        assert_eq!(classifier.transfer_kind(&out), TransferKind::Internal);
        assert_eq!(classifier.transfer_kind(&inflow), TransferKind::Internal);
        assert!(!classifier.counts_toward_budget(&out));
        assert!(!classifier.counts_toward_budget(&inflow));
    }

    #[test]
    fn transfer_id_resolves_through_counterpart_leg() {
        let accounts = [account("A", false), account("C", false)];
        let mut out = tx("A", -500);
        out.id = Some("t1".to_string());
        out.transfer_id = Some("t2".to_string());
        let mut inflow = tx("C", 500);
        inflow.id = Some("t2".to_string());
        inflow.transfer_id = Some("t1".to_string());
        let transactions = [out.clone(), inflow];

        let classifier = Classifier::new(&accounts, &[]).with_transactions(&transactions);
        assert_eq!(classifier.transfer_destination(&out), Some("C"));
        assert_eq!(classifier.transfer_kind(&out), TransferKind::Internal);
    }

    #[test]
    fn regular_payee_is_not_a_transfer() {
        let accounts = [account("A", false)];
        let payees = [Payee {
            id: "shop".to_string(),
            name: "Shop".to_string(),
            category: Some("groceries".to_string()),
            transfer_account: None,
        }];
        let classifier = Classifier::new(&accounts, &payees);
        let mut t = tx("A", -100);
        t.payee = Some("shop".to_string());
        assert_eq!(classifier.transfer_kind(&t), TransferKind::NotTransfer);
        assert!(classifier.counts_toward_budget(&t));
    }

    #[test]
    fn off_budget_and_unknown_accounts_do_not_count() {
        let accounts = [account("B", true)];
        let classifier = Classifier::new(&accounts, &[]);
        assert!(!classifier.counts_toward_budget(&tx("B", -100)));
        assert!(!classifier.counts_toward_budget(&tx("missing", -100)));
    }
}
