use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::ledger::LedgerScope;
use crate::pipeline::Pipeline;
use crate::{ClientError, ClientResult};

#[derive(Debug)]
pub struct ReconcileOptions<'a> {
    pub path: Option<PathBuf>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub config: &'a AppConfig,
}

pub fn run_with_options(
    pipeline: &Pipeline,
    options: ReconcileOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let scope = match (options.from, options.to) {
        (Some(from), Some(to)) => Some(LedgerScope::new(from, to)?),
        (None, None) => None,
        _ => {
            return Err(ClientError::invalid_argument_for_command(
                "`--from` and `--to` must be given together.",
                Some("reconcile"),
            ));
        }
    };

    let path = options
        .path
        .unwrap_or_else(|| options.config.csv_path.clone());
    let run = pipeline.reconcile_local(&path, scope)?;
    success("reconcile", run.to_contract())
}
