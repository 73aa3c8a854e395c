//! Matching-key construction for reconciliation.
//!
//! Everything here is pure: the same transaction always yields the same key
//! for a given [`SignatureMode`].

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ledger::{PaymentMethod, PersistedExpenseTransaction};
use crate::statement::BankTransaction;

const DESCRIPTOR_METHODS: [(&str, PaymentMethod); 20] = [
    ("MST", PaymentMethod::DebitCard),
    ("POS", PaymentMethod::DebitCard),
    ("NETS", PaymentMethod::DebitCard),
    ("DEBIT", PaymentMethod::DebitCard),
    ("ATM", PaymentMethod::Cash),
    ("AWL", PaymentMethod::Cash),
    ("CASH", PaymentMethod::Cash),
    ("ICT", PaymentMethod::ElectronicTransfer),
    ("IBG", PaymentMethod::ElectronicTransfer),
    ("FAST", PaymentMethod::ElectronicTransfer),
    ("GIRO", PaymentMethod::ElectronicTransfer),
    ("ITR", PaymentMethod::ElectronicTransfer),
    ("PAYNOW", PaymentMethod::ElectronicTransfer),
    ("CC", PaymentMethod::CreditCard),
    ("CREDIT", PaymentMethod::CreditCard),
    ("VISA", PaymentMethod::CreditCard),
    ("GRAB", PaymentMethod::EWallet),
    ("PAYLAH", PaymentMethod::EWallet),
    ("EWALLET", PaymentMethod::EWallet),
    ("E-WALLET", PaymentMethod::EWallet),
];

/// Which half of a record identifies it beyond date and amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    PaymentMethod,
    Description,
}

impl SignatureMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentMethod => "payment_method",
            Self::Description => "description",
        }
    }

    /// Payment-method matching applies only when every bank row carries a
    /// recognised descriptor.
    pub fn for_statement(bank: &[BankTransaction]) -> Self {
        let all_mapped = !bank.is_empty()
            && bank.iter().all(|transaction| {
                transaction
                    .reference
                    .as_deref()
                    .and_then(payment_method_for_descriptor)
                    .is_some()
            });

        if all_mapped {
            Self::PaymentMethod
        } else {
            Self::Description
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signature {
    Method(PaymentMethod),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub signature: Signature,
}

impl MatchKey {
    pub fn for_bank(transaction: &BankTransaction, mode: SignatureMode) -> Self {
        let signature = match mode {
            SignatureMode::PaymentMethod => match transaction
                .reference
                .as_deref()
                .and_then(payment_method_for_descriptor)
            {
                Some(method) => Signature::Method(method),
                None => Signature::Text(normalize_description(&transaction.description)),
            },
            SignatureMode::Description => {
                Signature::Text(normalize_description(&transaction.description))
            }
        };

        Self {
            transaction_date: transaction.transaction_date,
            amount: normalize_amount(transaction.amount),
            signature,
        }
    }

    pub fn for_ledger(transaction: &PersistedExpenseTransaction, mode: SignatureMode) -> Self {
        let signature = match mode {
            SignatureMode::PaymentMethod => Signature::Method(transaction.payment_method),
            SignatureMode::Description => {
                Signature::Text(normalize_description(&transaction.description))
            }
        };

        Self {
            transaction_date: transaction.transaction_date,
            amount: normalize_amount(transaction.amount),
            signature,
        }
    }
}

/// Trims, collapses whitespace runs to a single space, and uppercases.
pub fn normalize_description(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_uppercase()
}

/// Maps a bank transaction descriptor (e.g. `POS`, `ICT`) to the ledger's
/// payment method.
pub fn payment_method_for_descriptor(descriptor: &str) -> Option<PaymentMethod> {
    let normalized = normalize_description(descriptor);
    DESCRIPTOR_METHODS
        .iter()
        .find(|(code, _)| *code == normalized)
        .map(|(_, method)| *method)
}

// `1.50` and `1.5` must produce the same key.
fn normalize_amount(amount: Decimal) -> Decimal {
    amount.normalize()
}
