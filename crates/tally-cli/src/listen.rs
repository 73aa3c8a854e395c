use std::io::{self, BufRead, Write};

use tally_client::ClientError;
use tally_client::commands::process;
use tally_client::pipeline::Pipeline;
use tracing::{info, warn};

use crate::output::{self, OutputMode};
use crate::stdout_io::write_line;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenSummary {
    pub received: usize,
    pub failed: usize,
}

/// Processes newline-delimited notifications from `reader` until EOF.
///
/// A bad line is reported on `writer` and the loop moves on; only an I/O
/// error on either stream ends it early.
pub fn listen<R, W>(
    pipeline: &Pipeline,
    reader: &mut R,
    writer: &mut W,
    mode: OutputMode,
) -> io::Result<ListenSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = ListenSummary::default();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }

        let result = match std::str::from_utf8(&buffer) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => process::run_json(pipeline, line),
            Err(error) => {
                warn!(error = %error, "notification line is not valid UTF-8");
                Err(ClientError::notification_malformed(&error.to_string()))
            }
        };

        summary.received += 1;
        let rendered = match &result {
            Ok(success) => output::render_stream_success(success, mode)?,
            Err(failure) => {
                summary.failed += 1;
                output::render_stream_failure(failure, mode)?
            }
        };
        write_line(writer, &rendered)?;
    }

    info!(
        received = summary.received,
        failed = summary.failed,
        "notification stream closed"
    );
    Ok(summary)
}
