//! Per-notification orchestration: identity, fetch, parse, ledger read,
//! reconcile, report.

use std::any::Any;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use tracing::{debug, error, info, info_span, warn};
use ulid::Ulid;

use crate::blob::BlobStore;
use crate::contracts::types::{ReconcileData, RowIssue, StatementSummary};
use crate::diagnostics::to_log_string;
use crate::ledger::{LedgerScope, TransactionReader};
use crate::notification::{ObjectIdentity, UploadNotification, extract_identity};
use crate::reconcile::{ReconciliationReport, reconcile};
use crate::report::Reporter;
use crate::statement::parse_statement;
use crate::{ClientError, ClientResult};

/// Everything a single reconciliation produced.
#[derive(Debug, Clone)]
pub struct ReconciliationRun {
    pub run_id: String,
    pub environment: String,
    pub identity: Option<ObjectIdentity>,
    /// Local file the statement came from, when not fetched from a bucket.
    pub source: Option<String>,
    pub statement: StatementSummary,
    pub issues: Vec<RowIssue>,
    pub scope: Option<LedgerScope>,
    pub report: ReconciliationReport,
}

impl ReconciliationRun {
    pub fn message(&self) -> String {
        if self.report.is_balanced() {
            format!(
                "Statement and ledger agree: {} transaction(s) matched.",
                self.report.matched
            )
        } else {
            format!(
                "Found {} discrepancy(ies): {} only on the statement, {} only in the ledger.",
                self.report.discrepancies.len(),
                self.report.bank_only_count(),
                self.report.ledger_only_count()
            )
        }
    }

    pub fn to_contract(&self) -> ReconcileData {
        ReconcileData {
            run_id: self.run_id.clone(),
            outcome: "reconciled".to_string(),
            message: self.message(),
            environment: self.environment.clone(),
            identity: self.identity.clone(),
            path: self.source.clone(),
            scope: self.scope,
            statement: Some(self.statement.clone()),
            summary: Some(self.report.summary()),
            discrepancies: self.report.discrepancy_rows(),
            issues: self.issues.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The notification named no object; nothing was fetched.
    Idle { run_id: String },
    Reconciled(Box<ReconciliationRun>),
    Failed {
        run_id: String,
        identity: Option<ObjectIdentity>,
        error: ClientError,
    },
}

impl ProcessOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            Self::Idle { run_id } | Self::Failed { run_id, .. } => run_id,
            Self::Reconciled(run) => &run.run_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::Reconciled(_) => "reconciled",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn to_contract(&self, environment: &str) -> ReconcileData {
        match self {
            Self::Reconciled(run) => run.to_contract(),
            Self::Idle { run_id } => ReconcileData {
                run_id: run_id.clone(),
                outcome: self.as_str().to_string(),
                message: "Notification named no object; nothing to reconcile.".to_string(),
                environment: environment.to_string(),
                identity: None,
                path: None,
                scope: None,
                statement: None,
                summary: None,
                discrepancies: Vec::new(),
                issues: Vec::new(),
            },
            Self::Failed {
                run_id,
                identity,
                error,
            } => ReconcileData {
                run_id: run_id.clone(),
                outcome: self.as_str().to_string(),
                message: format!("{}: {}", error.code, error.message),
                environment: environment.to_string(),
                identity: identity.clone(),
                path: None,
                scope: None,
                statement: None,
                summary: None,
                discrepancies: Vec::new(),
                issues: Vec::new(),
            },
        }
    }
}

pub fn new_run_id() -> String {
    format!("run_{}", Ulid::new())
}

pub struct Pipeline {
    blob_store: Box<dyn BlobStore>,
    ledger: Box<dyn TransactionReader>,
    reporters: Vec<Box<dyn Reporter>>,
    environment: String,
}

impl Pipeline {
    pub fn new(
        blob_store: Box<dyn BlobStore>,
        ledger: Box<dyn TransactionReader>,
        environment: &str,
    ) -> Self {
        Self {
            blob_store,
            ledger,
            reporters: Vec::new(),
            environment: environment.to_string(),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Handles one upload notification end to end.
    ///
    /// Never fails: every error, including a panic inside the run, is logged
    /// and returned as [`ProcessOutcome::Failed`].
    pub fn process(&self, notification: Option<&UploadNotification>) -> ProcessOutcome {
        let run_id = new_run_id();
        let span = info_span!(
            "reconciliation_run",
            run_id = run_id.as_str(),
            environment = self.environment.as_str()
        );
        let _entered = span.enter();

        let mut identity: Option<ObjectIdentity> = None;
        let attempt = catch_unwind(AssertUnwindSafe(|| {
            self.process_notification(&run_id, notification, &mut identity)
        }));

        let outcome = match attempt {
            Ok(Ok(Some(run))) => ProcessOutcome::Reconciled(Box::new(run)),
            Ok(Ok(None)) => ProcessOutcome::Idle {
                run_id: run_id.clone(),
            },
            Ok(Err(failure)) => ProcessOutcome::Failed {
                run_id: run_id.clone(),
                identity,
                error: failure,
            },
            Err(payload) => ProcessOutcome::Failed {
                run_id: run_id.clone(),
                identity,
                error: ClientError::internal_panic(&panic_detail(payload.as_ref())),
            },
        };

        if let Some(failure) = outcome.error() {
            error!(
                code = failure.code.as_str(),
                message = failure.message.as_str(),
                notification = to_log_string(&notification).as_str(),
                "reconciliation run failed"
            );
        }
        info!(
            outcome = outcome.as_str(),
            notification = to_log_string(&notification).as_str(),
            "processed upload notification"
        );
        outcome
    }

    fn process_notification(
        &self,
        run_id: &str,
        notification: Option<&UploadNotification>,
        identity_slot: &mut Option<ObjectIdentity>,
    ) -> ClientResult<Option<ReconciliationRun>> {
        let Some(identity) = extract_identity(notification)? else {
            info!("notification names no object; nothing to reconcile");
            return Ok(None);
        };
        *identity_slot = Some(identity.clone());
        debug!(location = identity.location().as_str(), "resolved object identity");

        let bytes = self.blob_store.fetch(&identity)?;
        let run = self.reconcile_bytes(run_id, Some(identity), None, &bytes, None)?;
        Ok(Some(run))
    }

    /// Reconciles a statement file on local disk, bypassing the blob store.
    pub fn reconcile_local(
        &self,
        path: &Path,
        scope_override: Option<LedgerScope>,
    ) -> ClientResult<ReconciliationRun> {
        let location = path.display().to_string();
        let bytes = fs::read(path).map_err(|error| {
            ClientError::invalid_argument_with_recovery(
                &format!("Could not read statement file `{location}`: {error}"),
                vec![
                    "Verify the path exists and is readable.".to_string(),
                    "Pass a path or set `TALLY_CSV_PATH`.".to_string(),
                ],
            )
        })?;

        let run_id = new_run_id();
        let span = info_span!(
            "reconciliation_run",
            run_id = run_id.as_str(),
            environment = self.environment.as_str()
        );
        let _entered = span.enter();
        self.reconcile_bytes(&run_id, None, Some(location), &bytes, scope_override)
    }

    fn reconcile_bytes(
        &self,
        run_id: &str,
        identity: Option<ObjectIdentity>,
        source: Option<String>,
        bytes: &[u8],
        scope_override: Option<LedgerScope>,
    ) -> ClientResult<ReconciliationRun> {
        let parsed = parse_statement(bytes)?;
        let scope = match scope_override {
            Some(scope) => Some(scope),
            None => LedgerScope::covering(&parsed.transactions),
        };

        let bank = match scope_override {
            Some(window) => parsed
                .transactions
                .iter()
                .filter(|transaction| window.contains(transaction.transaction_date))
                .cloned()
                .collect(),
            None => parsed.transactions.clone(),
        };

        let ledger = match scope {
            Some(window) => self.ledger.read_transactions(&window)?,
            None => {
                warn!("statement has no valid transactions; skipping ledger read");
                Vec::new()
            }
        };

        let run = ReconciliationRun {
            run_id: run_id.to_string(),
            environment: self.environment.clone(),
            identity,
            source,
            statement: parsed.summary,
            issues: parsed.issues,
            scope,
            report: reconcile(&bank, &ledger),
        };

        for reporter in &self.reporters {
            reporter.report(&run)?;
        }
        Ok(run)
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic payload".to_string()
}
