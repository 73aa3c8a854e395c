mod cli;
mod dispatch;
mod listen;
mod logging;
mod output;
mod stdout_io;

use std::io;
use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use stdout_io::write_stdout_text;
use tally_client::commands;
use tally_client::config::AppConfig;
use tally_client::pipeline::Pipeline;
use tally_client::{ClientError, ClientResult};
use tracing::{error, info};

const ROOT_HELP: &str = "tally - reconcile bank statements against the expense ledger

Usage:
  tally <command>

Start here:
  tally reconcile ./statement.csv
  tally process --help
";

const TOP_LEVEL_HELP: &str = "tally - reconcile bank statements against the expense ledger

USAGE: tally <command>

Reconcile a statement on disk:
  tally reconcile <path>                                  Match a CSV statement against the ledger
  tally reconcile <path> --from 2024-01-01 --to 2024-01-31
                                                          Restrict both sides to a date window

React to storage uploads:
  tally process <event.json>                              Reconcile the object named by one notification
  cat event.json | tally process                          Same, reading the notification from stdin
  tally listen                                            Process one notification per stdin line until EOF

Every command accepts --json for machine-readable output.

Configuration (environment):
  TALLY_HOME           Base directory (default ~/.expense-tally)
  TALLY_LEDGER_PATH    SQLite ledger (default <home>/ledger.db)
  TALLY_BLOB_ROOT      Uploaded statements (default <home>/blobs)
  TALLY_REPORT_DIR     Also write each run as JSON here
  TALLY_CSV_PATH       Default statement for `tally reconcile` (default /tmp/transaction.csv)
  TALLY_ENVIRONMENT    Label attached to every run (default local)
  TALLY_LOG            Log filter, e.g. debug or tally_client=trace (default info)
  TALLY_LOG_FORMAT     `json` for structured logs on stderr
";

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => return handle_parse_error(&err, &raw_args),
    };
    let mode = output::mode_for_command(&cli.command);

    logging::init();
    info!(command = cli.command.name(), "starting");

    let (config, pipeline) = match load(&cli.command) {
        Ok(loaded) => loaded,
        Err(failure) => {
            error!(
                code = failure.code.as_str(),
                message = failure.message.as_str(),
                "startup failed"
            );
            if output::print_failure(&failure, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(exit_code_for_error(&failure));
        }
    };

    if let cli::Commands::Listen { .. } = cli.command {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        let mut writer = io::stdout().lock();
        return match listen::listen(&pipeline, &mut reader, &mut writer, mode) {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(failure) => {
                error!(error = %failure, "notification stream failed");
                Err(ExitCode::from(2))
            }
        };
    }

    match dispatch::dispatch(&cli.command, &pipeline, &config) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if output::print_failure(&failure, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&failure))
        }
    }
}

fn load(command: &cli::Commands) -> ClientResult<(AppConfig, Pipeline)> {
    let config = AppConfig::from_env()?;
    info!(
        command = command.name(),
        environment = config.environment.as_str(),
        ledger_path = %config.ledger_path.display(),
        "loaded configuration"
    );
    let pipeline = commands::load_pipeline(&config)?;
    Ok((config, pipeline))
}

fn handle_parse_error(err: &clap::Error, raw_args: &[String]) -> Result<ExitCode, ExitCode> {
    if matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    ) {
        let text = if err.kind() != ErrorKind::DisplayVersion && is_top_level_help_request(raw_args)
        {
            TOP_LEVEL_HELP.to_string()
        } else {
            err.to_string()
        };
        if write_stdout_text(&text).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let command_hint = if matches!(
        err.kind(),
        ErrorKind::MissingRequiredArgument
            | ErrorKind::InvalidValue
            | ErrorKind::ValueValidation
            | ErrorKind::WrongNumberOfValues
            | ErrorKind::UnknownArgument
            | ErrorKind::ArgumentConflict
    ) {
        command_path_from_args(raw_args)
    } else {
        None
    };
    let clean_message = strip_clap_boilerplate(&err.to_string());
    let parse_error = ClientError::invalid_argument_for_command(&clean_message, command_hint);
    let mode = infer_requested_output_mode(raw_args);
    if output::print_failure(&parse_error, mode).is_err() {
        return Err(ExitCode::from(2));
    }
    Err(ExitCode::from(1))
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so our "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

fn command_path_from_args(raw_args: &[String]) -> Option<&'static str> {
    raw_args
        .iter()
        .skip(1)
        .find(|value| !value.starts_with('-'))
        .and_then(|value| match value.as_str() {
            "process" => Some("process"),
            "listen" => Some("listen"),
            "reconcile" => Some("reconcile"),
            _ => None,
        })
}

// Failures inside a run exit 1; internal failures outside one exit 2.
fn exit_code_for_error(error: &ClientError) -> ExitCode {
    let inside_run = error
        .data
        .as_ref()
        .is_some_and(|data| data.get("run_id").is_some());
    if !inside_run && error.is_internal() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tally_client::ClientError;

    use super::{command_path_from_args, infer_requested_output_mode, strip_clap_boilerplate};
    use crate::output::OutputMode;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn strips_usage_and_hint_lines() {
        let message = "error: unexpected argument '--nope' found\n\nUsage: tally reconcile [PATH]\n\nFor more information, try '--help'.\n";
        assert_eq!(
            strip_clap_boilerplate(message),
            "error: unexpected argument '--nope' found"
        );
    }

    #[test]
    fn command_hint_comes_from_first_positional() {
        assert_eq!(
            command_path_from_args(&args(&["tally", "--json", "reconcile", "x.csv"])),
            Some("reconcile")
        );
        assert_eq!(command_path_from_args(&args(&["tally", "bogus"])), None);
    }

    #[test]
    fn json_flag_anywhere_selects_json_errors() {
        assert_eq!(
            infer_requested_output_mode(&args(&["tally", "reconcile", "--json", "--from"])),
            OutputMode::Json
        );
        assert_eq!(
            infer_requested_output_mode(&args(&["tally", "reconcile"])),
            OutputMode::Text
        );
    }

    #[test]
    fn run_failures_exit_one_even_when_internal() {
        let in_run = ClientError::internal_panic("boom").with_data(json!({ "run_id": "run_X" }));
        let startup = ClientError::internal_panic("boom");
        assert_eq!(super::exit_code_for_error(&in_run), std::process::ExitCode::from(1));
        assert_eq!(super::exit_code_for_error(&startup), std::process::ExitCode::from(2));
    }
}
