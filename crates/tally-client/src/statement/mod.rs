pub mod parse;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::contracts::types::{RowIssue, StatementSummary};

pub use parse::{StatementRow, StatementRows, parse_statement};

/// Fractional digits kept for statement and ledger amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Row issues kept in a [`ParsedStatement`]; later issues are only counted.
pub const MAX_ROW_ISSUES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankTransaction {
    /// Line number of the row in the source file (the header is line 1).
    pub row: i64,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub transactions: Vec<BankTransaction>,
    pub issues: Vec<RowIssue>,
    pub summary: StatementSummary,
}
