use std::collections::{HashMap, VecDeque};

use crate::ledger::PersistedExpenseTransaction;
use crate::reconcile::normalize::{MatchKey, SignatureMode};
use crate::statement::BankTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedReason {
    /// No ledger record shares the key.
    NoCounterpart,
    /// Ledger records share the key but earlier bank rows consumed them all.
    CounterpartsExhausted,
}

impl UnmatchedReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoCounterpart => "no_ledger_counterpart",
            Self::CounterpartsExhausted => "ledger_counterparts_exhausted",
        }
    }
}

/// Positions into the inputs handed to [`match_transactions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: usize,
    pub bank_only: Vec<(usize, UnmatchedReason)>,
    pub ledger_only: Vec<usize>,
}

struct LedgerIndex {
    queues: HashMap<MatchKey, VecDeque<usize>>,
}

impl LedgerIndex {
    fn build(ledger: &[PersistedExpenseTransaction], mode: SignatureMode) -> Self {
        let mut queues: HashMap<MatchKey, VecDeque<usize>> = HashMap::new();
        for (position, transaction) in ledger.iter().enumerate() {
            queues
                .entry(MatchKey::for_ledger(transaction, mode))
                .or_default()
                .push_back(position);
        }
        Self { queues }
    }

    fn take(&mut self, key: &MatchKey) -> Result<usize, UnmatchedReason> {
        let Some(queue) = self.queues.get_mut(key) else {
            return Err(UnmatchedReason::NoCounterpart);
        };
        queue
            .pop_front()
            .ok_or(UnmatchedReason::CounterpartsExhausted)
    }

    fn remaining(self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.queues.into_values().flatten().collect();
        positions.sort_unstable();
        positions
    }
}

/// Multiset match of bank rows against ledger rows.
///
/// Each ledger row is consumed at most once, earliest store position first.
/// Unmatched bank rows keep bank order; leftover ledger rows keep store order.
pub fn match_transactions(
    bank: &[BankTransaction],
    ledger: &[PersistedExpenseTransaction],
    mode: SignatureMode,
) -> MatchOutcome {
    let mut index = LedgerIndex::build(ledger, mode);
    let mut outcome = MatchOutcome::default();

    for (position, transaction) in bank.iter().enumerate() {
        match index.take(&MatchKey::for_bank(transaction, mode)) {
            Ok(_) => outcome.matched += 1,
            Err(reason) => outcome.bank_only.push((position, reason)),
        }
    }

    outcome.ledger_only = index.remaining();
    outcome
}
