//! Sinks for finished reconciliation runs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::pipeline::ReconciliationRun;
use crate::reconcile::DiscrepantTransaction;
use crate::{ClientError, ClientResult};

pub trait Reporter: Send + Sync {
    fn report(&self, run: &ReconciliationRun) -> ClientResult<()>;
}

/// Emits one warning per discrepancy and an info summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, run: &ReconciliationRun) -> ClientResult<()> {
        for discrepancy in &run.report.discrepancies {
            match discrepancy {
                DiscrepantTransaction::BankOnly {
                    transaction,
                    reason,
                } => warn!(
                    run_id = run.run_id.as_str(),
                    side = discrepancy.side().as_str(),
                    reason = reason.as_str(),
                    statement_row = transaction.row,
                    transaction_date = %transaction.transaction_date,
                    amount = %transaction.amount,
                    description = transaction.description.as_str(),
                    "statement transaction missing from ledger"
                ),
                DiscrepantTransaction::LedgerOnly { transaction } => warn!(
                    run_id = run.run_id.as_str(),
                    side = discrepancy.side().as_str(),
                    ledger_id = transaction.id,
                    transaction_date = %transaction.transaction_date,
                    amount = %transaction.amount,
                    payment_method = transaction.payment_method.as_str(),
                    description = transaction.description.as_str(),
                    "ledger transaction missing from statement"
                ),
            }
        }

        info!(
            run_id = run.run_id.as_str(),
            signature_mode = run.report.signature_mode.as_str(),
            bank_count = run.report.bank_count,
            ledger_count = run.report.ledger_count,
            matched = run.report.matched,
            bank_only = run.report.bank_only_count(),
            ledger_only = run.report.ledger_only_count(),
            rows_invalid = run.statement.rows_invalid,
            "reconciliation complete"
        );
        Ok(())
    }
}

/// Writes each run as pretty JSON to `<dir>/<run_id>.json`.
#[derive(Debug, Clone)]
pub struct FileReporter {
    dir: PathBuf,
}

impl FileReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

impl Reporter for FileReporter {
    fn report(&self, run: &ReconciliationRun) -> ClientResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|error| ClientError::report_write_failed(&self.dir, &error.to_string()))?;

        let path = self.report_path(&run.run_id);
        let body = serde_json::to_string_pretty(&run.to_contract())
            .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
        write_report(&path, body.as_bytes())?;

        info!(run_id = run.run_id.as_str(), path = %path.display(), "wrote reconciliation report");
        Ok(())
    }
}

fn write_report(path: &Path, body: &[u8]) -> ClientResult<()> {
    fs::write(path, body).map_err(|error| ClientError::report_write_failed(path, &error.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use super::{FileReporter, LogReporter, Reporter};
    use crate::contracts::types::StatementSummary;
    use crate::ledger::{PaymentMethod, PersistedExpenseTransaction};
    use crate::pipeline::ReconciliationRun;
    use crate::reconcile::reconcile;

    fn run() -> ReconciliationRun {
        let ledger = [PersistedExpenseTransaction {
            id: 3,
            transaction_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap_or_default(),
            amount: dec!(-8.00),
            payment_method: PaymentMethod::Cash,
            description: "Parking".to_string(),
        }];
        ReconciliationRun {
            run_id: "run_TEST".to_string(),
            environment: "test".to_string(),
            identity: None,
            source: Some("/tmp/statement.csv".to_string()),
            statement: StatementSummary::default(),
            issues: Vec::new(),
            scope: None,
            report: reconcile(&[], &ledger),
        }
    }

    #[test]
    fn log_reporter_never_fails() {
        assert!(LogReporter.report(&run()).is_ok());
    }

    #[test]
    fn file_reporter_writes_run_json() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let reporter = FileReporter::new(temp.path().join("reports"));
            assert!(reporter.report(&run()).is_ok());

            let written = std::fs::read_to_string(reporter.report_path("run_TEST"));
            assert!(written.is_ok());
            if let Ok(body) = written {
                let value: Result<serde_json::Value, _> = serde_json::from_str(&body);
                assert!(value.is_ok());
                if let Ok(value) = value {
                    assert_eq!(value["run_id"], "run_TEST");
                    assert_eq!(value["summary"]["ledger_only"], 1);
                    assert_eq!(value["discrepancies"][0]["ledger_id"], 3);
                }
            }
        }
    }

    #[test]
    fn unwritable_directory_is_a_report_failure() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let blocker = temp.path().join("not-a-dir");
            assert!(std::fs::write(&blocker, b"file").is_ok());
            let reporter = FileReporter::new(blocker.join("reports"));
            let result = reporter.report(&run());
            assert!(matches!(result, Err(error) if error.code == "report_write_failed"));
        }
    }
}
