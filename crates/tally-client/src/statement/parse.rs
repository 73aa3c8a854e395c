use std::str::FromStr;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::contracts::types::{RowIssue, StatementSummary};
use crate::statement::{BankTransaction, CURRENCY_SCALE, MAX_ROW_ISSUES, ParsedStatement};
use crate::{ClientError, ClientResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const REQUIRED_COLUMNS: usize = 3;
const MAX_COLUMNS: usize = 4;
const DATE_EXPECTATION: &str = "YYYY-MM-DD or DD Mon YYYY";
const AMOUNT_EXPECTATION: &str = "number with <= 2 decimal places (e.g. -42.15)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementRow {
    Transaction(BankTransaction),
    Blank,
    Malformed(RowIssue),
}

/// Lazily decodes the data rows of a statement.
///
/// Construction validates the encoding and the header; rows are decoded one
/// at a time as the iterator is driven. Building a new `StatementRows` over
/// the same bytes restarts from the first data row.
pub struct StatementRows<'a> {
    content: &'a [u8],
    reader: csv::Reader<&'a [u8]>,
    record: StringRecord,
    next_line: i64,
}

impl<'a> StatementRows<'a> {
    pub fn new(bytes: &'a [u8]) -> ClientResult<Self> {
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if std::str::from_utf8(content).is_err() {
            return Err(ClientError::statement_unreadable(
                "Statement is not valid UTF-8 text.",
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content);

        let header_is_blank = reader
            .headers()
            .map(|headers| headers.iter().all(|value| value.trim().is_empty()))
            .map_err(|_| ClientError::statement_unreadable("Statement header row is unreadable."))?;
        if header_is_blank {
            return Err(ClientError::statement_unreadable(
                "Statement is empty or has no header row.",
            ));
        }

        Ok(Self {
            content,
            reader,
            record: StringRecord::new(),
            next_line: 2,
        })
    }
}

impl StatementRows<'_> {
    /// The reader may stamp a record before the empty lines it skips; count
    /// those so issues point at the line the record actually starts on.
    fn record_start_line(&self, position: &csv::Position) -> i64 {
        let offset = usize::try_from(position.byte()).unwrap_or(usize::MAX);
        let skipped = self
            .content
            .get(offset..)
            .unwrap_or_default()
            .iter()
            .take_while(|byte| matches!(byte, b'\r' | b'\n'))
            .filter(|byte| **byte == b'\n')
            .count();
        position.line() as i64 + skipped as i64
    }
}

impl Iterator for StatementRows<'_> {
    type Item = StatementRow;

    fn next(&mut self) -> Option<Self::Item> {
        let fallback_line = self.next_line;
        let read = self.reader.read_record(&mut self.record);
        let line = self
            .record
            .position()
            .map(|position| self.record_start_line(position))
            .unwrap_or(fallback_line);
        self.next_line = line + 1;

        match read {
            Ok(false) => None,
            Ok(true) => Some(decode_row(line, &self.record)),
            Err(error) => Some(StatementRow::Malformed(RowIssue {
                row: line,
                field: None,
                code: "malformed_row".to_string(),
                description: format!("row could not be read as CSV: {error}"),
                expected: None,
                received: None,
            })),
        }
    }
}

/// Parses a whole statement, collecting well-formed rows and a bounded list of
/// row issues. Malformed rows never abort the file.
pub fn parse_statement(bytes: &[u8]) -> ClientResult<ParsedStatement> {
    let mut transactions = Vec::new();
    let mut issues = Vec::new();
    let mut rows_read = 0_i64;
    let mut rows_blank = 0_i64;
    let mut rows_invalid = 0_i64;

    for row in StatementRows::new(bytes)? {
        rows_read += 1;
        match row {
            StatementRow::Transaction(transaction) => transactions.push(transaction),
            StatementRow::Blank => rows_blank += 1,
            StatementRow::Malformed(issue) => {
                rows_invalid += 1;
                warn!(
                    row = issue.row,
                    code = issue.code.as_str(),
                    "skipping malformed statement row"
                );
                if issues.len() < MAX_ROW_ISSUES {
                    issues.push(issue);
                }
            }
        }
    }

    let summary = StatementSummary {
        rows_read,
        rows_blank,
        rows_valid: transactions.len() as i64,
        rows_invalid,
        issues_truncated: rows_invalid > issues.len() as i64,
    };
    debug!(
        rows_read,
        rows_valid = summary.rows_valid,
        rows_invalid,
        rows_blank,
        "parsed statement"
    );

    Ok(ParsedStatement {
        transactions,
        issues,
        summary,
    })
}

fn decode_row(line: i64, record: &StringRecord) -> StatementRow {
    if record.iter().all(|value| value.trim().is_empty()) {
        return StatementRow::Blank;
    }

    if record.len() < REQUIRED_COLUMNS || record.len() > MAX_COLUMNS {
        return StatementRow::Malformed(RowIssue {
            row: line,
            field: None,
            code: "wrong_column_count".to_string(),
            description: format!(
                "row must have {REQUIRED_COLUMNS} or {MAX_COLUMNS} columns; got {}",
                record.len()
            ),
            expected: Some("date,amount,description[,reference]".to_string()),
            received: Some(record.iter().collect::<Vec<&str>>().join(",")),
        });
    }

    let raw_date = record.get(0).unwrap_or_default().trim();
    let Some(transaction_date) = parse_statement_date(raw_date) else {
        return StatementRow::Malformed(RowIssue {
            row: line,
            field: Some("date".to_string()),
            code: "invalid_date".to_string(),
            description: format!("date must be {DATE_EXPECTATION}; got \"{raw_date}\""),
            expected: Some(DATE_EXPECTATION.to_string()),
            received: Some(raw_date.to_string()),
        });
    };

    let raw_amount = record.get(1).unwrap_or_default().trim();
    let amount = match parse_amount(raw_amount) {
        Ok(value) => value,
        Err(issue) => return StatementRow::Malformed(issue.at(line, raw_amount)),
    };

    let description = collapse_whitespace(record.get(2).unwrap_or_default());
    let reference = record
        .get(3)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    StatementRow::Transaction(BankTransaction {
        row: line,
        transaction_date,
        amount,
        description,
        reference,
    })
}

pub(crate) fn parse_statement_date(value: &str) -> Option<NaiveDate> {
    if looks_like_iso_date(value) {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    }
    NaiveDate::parse_from_str(value, "%d %b %Y").ok()
}

fn looks_like_iso_date(value: &str) -> bool {
    if value.len() != 10 {
        return false;
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }

    [0usize, 1, 2, 3, 5, 6, 8, 9]
        .iter()
        .all(|index| bytes[*index].is_ascii_digit())
}

#[derive(Debug)]
enum AmountIssue {
    Missing,
    NotANumber,
    TooPrecise(u32),
}

impl AmountIssue {
    fn at(self, row: i64, raw: &str) -> RowIssue {
        let (code, description) = match self {
            Self::Missing => (
                "invalid_number",
                "amount must be present and non-empty.".to_string(),
            ),
            Self::NotANumber => ("invalid_number", format!("amount must be numeric; got \"{raw}\"")),
            Self::TooPrecise(scale) => (
                "invalid_amount_scale",
                format!("amount must use at most {CURRENCY_SCALE} decimal places; got {scale} decimal places."),
            ),
        };
        RowIssue {
            row,
            field: Some("amount".to_string()),
            code: code.to_string(),
            description,
            expected: Some(AMOUNT_EXPECTATION.to_string()),
            received: Some(raw.to_string()),
        }
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, AmountIssue> {
    if raw.is_empty() {
        return Err(AmountIssue::Missing);
    }

    let without_separators = strip_thousands_separators(raw).ok_or(AmountIssue::NotANumber)?;
    let candidate = without_separators
        .strip_prefix('+')
        .unwrap_or(&without_separators);
    if !candidate
        .chars()
        .all(|character| character.is_ascii_digit() || character == '.' || character == '-')
    {
        return Err(AmountIssue::NotANumber);
    }

    let mut amount = Decimal::from_str(candidate).map_err(|_| AmountIssue::NotANumber)?;
    if amount.scale() > CURRENCY_SCALE {
        return Err(AmountIssue::TooPrecise(amount.scale()));
    }
    amount.rescale(CURRENCY_SCALE);
    Ok(amount)
}

/// Removes `,` grouping from the integer part, e.g. `-1,234.50` -> `-1234.50`.
///
/// Groups after the first must be exactly three digits and the fraction may
/// not contain separators, so `12,50` and `1,23.4` are rejected.
fn strip_thousands_separators(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }

    let unsigned = raw.trim_start_matches(['+', '-']);
    let sign = &raw[..raw.len() - unsigned.len()];
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    if fraction.is_some_and(|digits| digits.contains(',')) {
        return None;
    }

    let mut groups = integer.split(',');
    let leading = groups.next()?;
    if leading.is_empty() || leading.len() > 3 || !leading.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits = leading.to_string();
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    Some(match fraction {
        Some(fraction) => format!("{sign}{digits}.{fraction}"),
        None => format!("{sign}{digits}"),
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}
