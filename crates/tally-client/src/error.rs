use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const PROCESS_HELP_COMMAND: &str = "tally process --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `tally {cmd} --help` for usage."),
            None => "Run `tally --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn inconsistent_object_identity(bucket: Option<&str>, key: Option<&str>) -> Self {
        Self::new(
            "inconsistent_object_identity",
            "Bucket name and object key must be present or absent together.",
            vec![
                "Check the storage trigger configuration for the bucket.".to_string(),
                "Resend a notification that names both bucket and key.".to_string(),
            ],
        )
        .with_data(json!({
            "bucket": bucket,
            "key": key,
        }))
    }

    pub fn notification_malformed(detail: &str) -> Self {
        Self::new(
            "notification_malformed",
            &format!("Upload notification is not valid JSON: {detail}"),
            vec![
                "Provide the notification as a JSON object with a `Records` array.".to_string(),
                format!("Run `{PROCESS_HELP_COMMAND}` for the expected shape."),
            ],
        )
    }

    pub fn object_not_found(location: &str) -> Self {
        Self::new(
            "object_not_found",
            &format!("Statement object `{location}` was not found."),
            vec![
                "Verify the bucket, key, and version named in the notification.".to_string(),
                "Confirm the blob store root points at the right directory.".to_string(),
            ],
        )
        .with_data(json!({
            "location": location,
        }))
    }

    pub fn object_fetch_failed(location: &str, detail: &str) -> Self {
        Self::new(
            "object_fetch_failed",
            &format!("Could not read statement object `{location}`: {detail}"),
            vec!["Retry once the blob store is reachable.".to_string()],
        )
        .with_data(json!({
            "location": location,
        }))
    }

    pub fn invalid_object_key(key: &str) -> Self {
        Self::new(
            "invalid_object_key",
            &format!("Object key `{key}` escapes the bucket."),
            vec!["Use a relative object key without `..` segments.".to_string()],
        )
    }

    pub fn statement_unreadable(message: &str) -> Self {
        Self::new(
            "statement_unreadable",
            message,
            vec![
                "Export the statement again as UTF-8 CSV with a header row.".to_string(),
                "Expected columns: date, amount, description, reference (optional).".to_string(),
            ],
        )
    }

    pub fn config_invalid(variable: &str, detail: &str) -> Self {
        Self::new(
            "config_invalid",
            &format!("Configuration `{variable}` is invalid: {detail}"),
            vec![format!("Unset `{variable}` or give it a non-blank value.")],
        )
        .with_data(json!({
            "variable": variable,
        }))
    }

    pub fn report_write_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "report_write_failed",
            &format!("Could not write reconciliation report to `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or unset `TALLY_REPORT_DIR`."
            )],
        )
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn internal_panic(detail: &str) -> Self {
        Self::new(
            "internal_panic",
            &format!("Reconciliation run aborted unexpectedly: {detail}"),
            Vec::new(),
        )
    }

    pub fn ledger_row_invalid(path: &Path, id: i64, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_row_invalid",
            &format!("Ledger transaction {id} in `{location}` is unreadable: {detail}"),
            vec!["Correct the stored row in the expense ledger and rerun.".to_string()],
        )
        .with_data(json!({
            "transaction_id": id,
        }))
    }

    pub fn ledger_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_permission_denied",
            &format!("Cannot open ledger at `{location}`: {detail}"),
            vec![format!(
                "Grant access to `{location}` or set `TALLY_LEDGER_PATH` to a readable file."
            )],
        )
    }

    pub fn ledger_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_locked",
            &format!("Ledger database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn ledger_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_corrupt",
            &format!("Ledger database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite ledger file or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Ledger migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn ledger_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_failed",
            &format!("Ledger initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn is_internal(&self) -> bool {
        self.code.starts_with("internal_")
            || matches!(
                self.code.as_str(),
                "ledger_init_permission_denied"
                    | "ledger_locked"
                    | "ledger_corrupt"
                    | "migration_failed"
                    | "ledger_init_failed"
            )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
