pub mod process;
pub mod reconcile;

use tracing::debug;

use crate::ClientResult;
use crate::blob::LocalBlobStore;
use crate::config::AppConfig;
use crate::ledger::SqliteLedger;
use crate::pipeline::Pipeline;
use crate::report::{FileReporter, LogReporter};

/// Wires the configured collaborators into a pipeline.
///
/// Opening the ledger creates its schema when missing, so this is where
/// ledger permission and corruption problems surface.
pub fn load_pipeline(config: &AppConfig) -> ClientResult<Pipeline> {
    let ledger = SqliteLedger::open(&config.ledger_path)?;
    debug!(
        ledger_path = %config.ledger_path.display(),
        blob_root = %config.blob_root.display(),
        environment = config.environment.as_str(),
        "loaded pipeline collaborators"
    );

    let mut pipeline = Pipeline::new(
        Box::new(LocalBlobStore::new(&config.blob_root)),
        Box::new(ledger),
        &config.environment,
    )
    .with_reporter(Box::new(LogReporter));

    if let Some(report_dir) = &config.report_dir {
        pipeline = pipeline.with_reporter(Box::new(FileReporter::new(report_dir)));
    }
    Ok(pipeline)
}
