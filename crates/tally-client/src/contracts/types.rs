use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::LedgerScope;
use crate::notification::ObjectIdentity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub description: String,
    pub expected: Option<String>,
    pub received: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    /// Data records seen after the header. Fully empty lines are skipped by
    /// the CSV reader and never reach this count.
    pub rows_read: i64,
    /// Records whose fields are all whitespace.
    pub rows_blank: i64,
    pub rows_valid: i64,
    pub rows_invalid: i64,
    pub issues_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub signature_mode: String,
    pub bank_count: i64,
    pub ledger_count: i64,
    pub matched: i64,
    pub bank_only: i64,
    pub ledger_only: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyRow {
    pub side: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileData {
    pub run_id: String,
    pub outcome: String,
    pub message: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ObjectIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub scope: Option<LedgerScope>,
    pub statement: Option<StatementSummary>,
    pub summary: Option<ReconcileSummary>,
    pub discrepancies: Vec<DiscrepancyRow>,
    pub issues: Vec<RowIssue>,
}
