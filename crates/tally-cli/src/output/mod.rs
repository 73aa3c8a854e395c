mod error_text;
mod format;
mod json;
mod mode;
mod reconcile_text;

use std::io;

use tally_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    write_stdout_line(&render_success(success, mode)?)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    write_stdout_line(&render_failure(error, mode)?)
}

pub fn render_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<String> {
    match mode {
        OutputMode::Text => render_text_success(success),
        OutputMode::Json => json::render_success_json(success),
    }
}

pub fn render_failure(error: &ClientError, mode: OutputMode) -> io::Result<String> {
    match mode {
        OutputMode::Json => json::render_error_json(error),
        OutputMode::Text => Ok(error_text::render_error(error)),
    }
}

/// One record per notification for `listen`: a compact JSON line, or a text
/// block followed by a blank separator line.
pub fn render_stream_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<String> {
    match mode {
        OutputMode::Json => json::render_line(&json::success_value(success)),
        OutputMode::Text => Ok(format!("{}\n", render_text_success(success)?)),
    }
}

pub fn render_stream_failure(error: &ClientError, mode: OutputMode) -> io::Result<String> {
    match mode {
        OutputMode::Json => json::render_line(&json::error_value(error)),
        OutputMode::Text => Ok(format!("{}\n", error_text::render_error(error))),
    }
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "process" | "reconcile" => reconcile_text::render_reconcile_data(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
