use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

const DATE_FORMAT_HINT: &str = "date must use YYYY-MM-DD format";

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    if value.len() != 10 {
        return Err(DATE_FORMAT_HINT.to_string());
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(DATE_FORMAT_HINT.to_string());
    }

    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return Err(DATE_FORMAT_HINT.to_string());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "date must use valid calendar values".to_string())
}

/// Shown after `tally process --help`.
pub const PROCESS_AFTER_HELP: &str = "\
Notification shape:
  {
    \"Records\": [
      {
        \"eventName\": \"ObjectCreated:Put\",
        \"s3\": {
          \"bucket\": { \"name\": \"statements\" },
          \"object\": { \"key\": \"2024-01.csv\", \"versionId\": \"v1\" }
        }
      }
    ]
  }

  Only the first record is processed. A record without bucket and key is
  skipped as idle; a record naming only one of them fails.

Where statements are read from:
  <TALLY_BLOB_ROOT>/<bucket>/<key>
  <TALLY_BLOB_ROOT>/<bucket>/.versions/<versionId>/<key>
";

/// Shown after `tally reconcile --help`.
pub const RECONCILE_AFTER_HELP: &str = "\
Statement format (CSV with a header row):
  date,amount,description,reference
  2024-01-05,-12.50,Coffee Shop,POS
  05 Jan 2024,-40.00,ATM WITHDRAWAL,ATM

  `reference` is optional. When every row's reference is a known bank
  descriptor (POS, ATM, ICT, ...), rows are matched on payment method;
  otherwise on description.

Ledger window:
  Without --from/--to the window spans the statement's first to last date.
";

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    version,
    about = "reconcile bank statements against the expense ledger",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the statement named by one upload notification
    #[command(after_help = PROCESS_AFTER_HELP)]
    Process {
        /// Notification JSON file; `-` or omitted reads stdin
        path: Option<String>,
        /// Emit structured JSON object output for machine parsing
        #[arg(long)]
        json: bool,
    },
    /// Process newline-delimited notifications from stdin until it closes
    Listen {
        /// Emit one JSON object per processed notification
        #[arg(long)]
        json: bool,
    },
    /// Reconcile a local statement file against the ledger
    #[command(after_help = RECONCILE_AFTER_HELP)]
    Reconcile {
        /// Statement CSV path (defaults to TALLY_CSV_PATH)
        path: Option<PathBuf>,
        /// Ledger window start (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date, requires = "to")]
        from: Option<NaiveDate>,
        /// Ledger window end (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date, requires = "from")]
        to: Option<NaiveDate>,
        /// Emit structured JSON object output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Process { .. } => "process",
            Self::Listen { .. } => "listen",
            Self::Reconcile { .. } => "reconcile",
        }
    }

    pub fn wants_json(&self) -> bool {
        match self {
            Self::Process { json, .. } | Self::Listen { json } | Self::Reconcile { json, .. } => {
                *json
            }
        }
    }
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
