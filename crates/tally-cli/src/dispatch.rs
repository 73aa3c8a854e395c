use tally_client::commands::{self, reconcile::ReconcileOptions};
use tally_client::config::AppConfig;
use tally_client::pipeline::Pipeline;
use tally_client::{ClientError, ClientResult, SuccessEnvelope};

use crate::cli::Commands;

/// Runs a one-shot command. `listen` streams and is driven from `main`.
pub fn dispatch(
    command: &Commands,
    pipeline: &Pipeline,
    config: &AppConfig,
) -> ClientResult<SuccessEnvelope> {
    match command {
        Commands::Process { path, .. } => {
            let content = commands::process::read_source(path.as_deref(), None)?;
            commands::process::run_json(pipeline, &content)
        }
        Commands::Reconcile { path, from, to, .. } => commands::reconcile::run_with_options(
            pipeline,
            ReconcileOptions {
                path: path.clone(),
                from: *from,
                to: *to,
                config,
            },
        ),
        Commands::Listen { .. } => Err(ClientError::invalid_argument_for_command(
            "`listen` reads a stream and cannot be dispatched as a single command.",
            Some("listen"),
        )),
    }
}
