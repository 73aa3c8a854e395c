use std::fs;
use std::io::{IsTerminal, Read};

use serde_json::{Value, json};
use tracing::error;

use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::error::PROCESS_HELP_COMMAND;
use crate::notification::UploadNotification;
use crate::pipeline::{Pipeline, ProcessOutcome};
use crate::{ClientError, ClientResult};

/// Runs one typed notification through the pipeline.
///
/// Idle and reconciled outcomes are successes; a failed run is returned as
/// its error, tagged with the run id.
pub fn run(
    pipeline: &Pipeline,
    notification: Option<&UploadNotification>,
) -> ClientResult<SuccessEnvelope> {
    let outcome = pipeline.process(notification);
    let data = outcome.to_contract(pipeline.environment());

    match outcome {
        ProcessOutcome::Failed { run_id, error, .. } => Err(tag_run_id(error, &run_id)),
        ProcessOutcome::Idle { .. } | ProcessOutcome::Reconciled(_) => success("process", data),
    }
}

/// Parses raw notification JSON and runs it.
pub fn run_json(pipeline: &Pipeline, content: &str) -> ClientResult<SuccessEnvelope> {
    let notification = match UploadNotification::from_json(content) {
        Ok(notification) => notification,
        Err(failure) => {
            error!(
                code = failure.code.as_str(),
                message = failure.message.as_str(),
                "rejected upload notification"
            );
            return Err(failure);
        }
    };
    run(pipeline, Some(&notification))
}

/// Reads notification JSON from a file, or from stdin for `-` or no path.
pub fn read_source(path: Option<&str>, stdin_override: Option<String>) -> ClientResult<String> {
    match path {
        Some(path_value) if path_value != "-" => {
            fs::read_to_string(path_value).map_err(|error| {
                ClientError::invalid_argument_with_recovery(
                    &format!("Could not read notification file `{path_value}`: {error}"),
                    vec![
                        "Verify the path exists and is readable.".to_string(),
                        format!("Run `{PROCESS_HELP_COMMAND}` for usage."),
                    ],
                )
            })
        }
        _ => {
            let body = read_stdin(stdin_override)?;
            match body {
                Some(content) if !content.trim().is_empty() => Ok(content),
                _ => Err(ClientError::invalid_argument_for_command(
                    "No notification provided. Pass a file path or pipe JSON via stdin.",
                    Some("process"),
                )),
            }
        }
    }
}

fn read_stdin(stdin_override: Option<String>) -> ClientResult<Option<String>> {
    if let Some(value) = stdin_override {
        return Ok(Some(value));
    }

    if std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|error| {
            ClientError::invalid_argument_for_command(
                &format!("Could not read notification from stdin: {error}"),
                Some("process"),
            )
        })?;
    Ok(Some(buffer))
}

fn tag_run_id(error: ClientError, run_id: &str) -> ClientError {
    let mut data = match error.data.clone() {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    data.insert("run_id".to_string(), json!(run_id));
    error.with_data(Value::Object(data))
}
