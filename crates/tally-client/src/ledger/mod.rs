//! Read-only access to the expense ledger the statement is compared against.

pub mod connection;
pub mod sqlite;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::statement::BankTransaction;
use crate::{ClientError, ClientResult};

pub use sqlite::SqliteLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    DebitCard,
    CreditCard,
    ElectronicTransfer,
    EWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        Self::Cash,
        Self::DebitCard,
        Self::CreditCard,
        Self::ElectronicTransfer,
        Self::EWallet,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::DebitCard => "debit_card",
            Self::CreditCard => "credit_card",
            Self::ElectronicTransfer => "electronic_transfer",
            Self::EWallet => "e_wallet",
        }
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedExpenseTransaction {
    pub id: i64,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub description: String,
}

/// Inclusive date window bounding a ledger read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerScope {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl LedgerScope {
    pub fn new(from: NaiveDate, to: NaiveDate) -> ClientResult<Self> {
        if from > to {
            return Err(ClientError::invalid_argument_for_command(
                "Invalid date range: `from` must be on or before `to`.",
                Some("reconcile"),
            ));
        }
        Ok(Self { from, to })
    }

    /// The smallest window holding every statement transaction, or `None` for
    /// a statement without transactions.
    pub fn covering(transactions: &[BankTransaction]) -> Option<Self> {
        let from = transactions
            .iter()
            .map(|transaction| transaction.transaction_date)
            .min()?;
        let to = transactions
            .iter()
            .map(|transaction| transaction.transaction_date)
            .max()?;
        Some(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

pub trait TransactionReader: Send + Sync {
    /// Returns the ledger transactions dated inside `scope`, in store order.
    fn read_transactions(&self, scope: &LedgerScope)
    -> ClientResult<Vec<PersistedExpenseTransaction>>;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::{LedgerScope, PaymentMethod};
    use crate::statement::BankTransaction;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap_or_default()
    }

    fn bank(day: u32) -> BankTransaction {
        BankTransaction {
            row: 2,
            transaction_date: date(day),
            amount: dec!(1.00),
            description: "x".to_string(),
            reference: None,
        }
    }

    #[test]
    fn scope_covers_min_and_max_dates() {
        let scope = LedgerScope::covering(&[bank(9), bank(3), bank(15)]);
        assert_eq!(
            scope,
            Some(LedgerScope {
                from: date(3),
                to: date(15),
            })
        );
        if let Some(window) = scope {
            assert!(window.contains(date(3)));
            assert!(window.contains(date(15)));
            assert!(!window.contains(date(16)));
        }
    }

    #[test]
    fn empty_statement_has_no_scope() {
        assert_eq!(LedgerScope::covering(&[]), None);
    }

    #[test]
    fn inverted_scope_is_rejected() {
        let scope = LedgerScope::new(date(5), date(4));
        assert!(scope.is_err());
    }

    #[test]
    fn payment_methods_round_trip_through_stored_text() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::from_stored(method.as_str()), Some(method));
        }
        assert_eq!(
            PaymentMethod::from_stored(" Debit_Card "),
            Some(PaymentMethod::DebitCard)
        );
        assert_eq!(PaymentMethod::from_stored("cheque"), None);
    }
}
