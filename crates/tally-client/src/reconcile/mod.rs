//! Statement-versus-ledger reconciliation.

pub mod matcher;
pub mod normalize;

use tracing::debug;

use crate::contracts::types::{DiscrepancyRow, ReconcileSummary};
use crate::ledger::PersistedExpenseTransaction;
use crate::statement::BankTransaction;

pub use matcher::{MatchOutcome, UnmatchedReason, match_transactions};
pub use normalize::{
    MatchKey, Signature, SignatureMode, normalize_description, payment_method_for_descriptor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscrepancySide {
    BankOnly,
    LedgerOnly,
}

impl DiscrepancySide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankOnly => "bank_only",
            Self::LedgerOnly => "ledger_only",
        }
    }
}

/// A transaction present on exactly one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscrepantTransaction {
    BankOnly {
        transaction: BankTransaction,
        reason: UnmatchedReason,
    },
    LedgerOnly {
        transaction: PersistedExpenseTransaction,
    },
}

impl DiscrepantTransaction {
    pub const fn side(&self) -> DiscrepancySide {
        match self {
            Self::BankOnly { .. } => DiscrepancySide::BankOnly,
            Self::LedgerOnly { .. } => DiscrepancySide::LedgerOnly,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::BankOnly { reason, .. } => reason.as_str(),
            Self::LedgerOnly { .. } => "no_statement_counterpart",
        }
    }

    pub fn match_key(&self, mode: SignatureMode) -> MatchKey {
        match self {
            Self::BankOnly { transaction, .. } => MatchKey::for_bank(transaction, mode),
            Self::LedgerOnly { transaction } => MatchKey::for_ledger(transaction, mode),
        }
    }

    pub fn to_contract(&self) -> DiscrepancyRow {
        match self {
            Self::BankOnly {
                transaction,
                reason,
            } => DiscrepancyRow {
                side: DiscrepancySide::BankOnly.as_str().to_string(),
                transaction_date: transaction.transaction_date,
                amount: transaction.amount,
                description: transaction.description.clone(),
                statement_row: Some(transaction.row),
                reference: transaction.reference.clone(),
                ledger_id: None,
                payment_method: None,
                reason: reason.as_str().to_string(),
            },
            Self::LedgerOnly { transaction } => DiscrepancyRow {
                side: DiscrepancySide::LedgerOnly.as_str().to_string(),
                transaction_date: transaction.transaction_date,
                amount: transaction.amount,
                description: transaction.description.clone(),
                statement_row: None,
                reference: None,
                ledger_id: Some(transaction.id),
                payment_method: Some(transaction.payment_method.as_str().to_string()),
                reason: self.reason().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub signature_mode: SignatureMode,
    pub bank_count: usize,
    pub ledger_count: usize,
    pub matched: usize,
    /// Bank-only entries in statement order, then ledger-only entries in
    /// store order.
    pub discrepancies: Vec<DiscrepantTransaction>,
}

impl ReconciliationReport {
    pub fn empty() -> Self {
        Self {
            signature_mode: SignatureMode::Description,
            bank_count: 0,
            ledger_count: 0,
            matched: 0,
            discrepancies: Vec::new(),
        }
    }

    pub fn bank_only_count(&self) -> usize {
        self.count_side(DiscrepancySide::BankOnly)
    }

    pub fn ledger_only_count(&self) -> usize {
        self.count_side(DiscrepancySide::LedgerOnly)
    }

    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            signature_mode: self.signature_mode.as_str().to_string(),
            bank_count: self.bank_count as i64,
            ledger_count: self.ledger_count as i64,
            matched: self.matched as i64,
            bank_only: self.bank_only_count() as i64,
            ledger_only: self.ledger_only_count() as i64,
        }
    }

    pub fn discrepancy_rows(&self) -> Vec<DiscrepancyRow> {
        self.discrepancies
            .iter()
            .map(DiscrepantTransaction::to_contract)
            .collect()
    }

    fn count_side(&self, side: DiscrepancySide) -> usize {
        self.discrepancies
            .iter()
            .filter(|discrepancy| discrepancy.side() == side)
            .count()
    }
}

pub fn reconcile(
    bank: &[BankTransaction],
    ledger: &[PersistedExpenseTransaction],
) -> ReconciliationReport {
    let signature_mode = SignatureMode::for_statement(bank);
    let outcome = match_transactions(bank, ledger, signature_mode);

    let mut discrepancies =
        Vec::with_capacity(outcome.bank_only.len() + outcome.ledger_only.len());
    for (position, reason) in &outcome.bank_only {
        if let Some(transaction) = bank.get(*position) {
            discrepancies.push(DiscrepantTransaction::BankOnly {
                transaction: transaction.clone(),
                reason: *reason,
            });
        }
    }
    for position in &outcome.ledger_only {
        if let Some(transaction) = ledger.get(*position) {
            discrepancies.push(DiscrepantTransaction::LedgerOnly {
                transaction: transaction.clone(),
            });
        }
    }

    debug!(
        signature_mode = signature_mode.as_str(),
        bank_count = bank.len(),
        ledger_count = ledger.len(),
        matched = outcome.matched,
        discrepancies = discrepancies.len(),
        "reconciled statement against ledger"
    );

    ReconciliationReport {
        signature_mode,
        bank_count: bank.len(),
        ledger_count: ledger.len(),
        matched: outcome.matched,
        discrepancies,
    }
}
