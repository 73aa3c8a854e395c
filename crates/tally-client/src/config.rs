use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{ClientError, ClientResult};

pub const HOME_VAR: &str = "TALLY_HOME";
pub const LEDGER_PATH_VAR: &str = "TALLY_LEDGER_PATH";
pub const BLOB_ROOT_VAR: &str = "TALLY_BLOB_ROOT";
pub const REPORT_DIR_VAR: &str = "TALLY_REPORT_DIR";
pub const CSV_PATH_VAR: &str = "TALLY_CSV_PATH";
pub const ENVIRONMENT_VAR: &str = "TALLY_ENVIRONMENT";

const DEFAULT_HOME_DIR: &str = ".expense-tally";
const DEFAULT_CSV_PATH: &str = "/tmp/transaction.csv";
const DEFAULT_ENVIRONMENT: &str = "local";

/// Runtime settings, resolved and validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub home: PathBuf,
    pub ledger_path: PathBuf,
    pub blob_root: PathBuf,
    pub report_dir: Option<PathBuf>,
    pub csv_path: PathBuf,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = match non_blank(&lookup, HOME_VAR)? {
            Some(value) => absolutize_for(HOME_VAR, Path::new(&value))?,
            None => default_home()?,
        };

        let ledger_path = path_or(&lookup, LEDGER_PATH_VAR, || home.join("ledger.db"))?;
        let blob_root = path_or(&lookup, BLOB_ROOT_VAR, || home.join("blobs"))?;
        let report_dir = match non_blank(&lookup, REPORT_DIR_VAR)? {
            Some(value) => Some(absolutize_for(REPORT_DIR_VAR, Path::new(&value))?),
            None => None,
        };
        let csv_path = path_or(&lookup, CSV_PATH_VAR, || PathBuf::from(DEFAULT_CSV_PATH))?;
        let environment = non_blank(&lookup, ENVIRONMENT_VAR)?
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Ok(Self {
            home,
            ledger_path,
            blob_root,
            report_dir,
            csv_path,
            environment,
        })
    }
}

fn default_home() -> ClientResult<PathBuf> {
    match home::home_dir() {
        Some(path) => Ok(path.join(DEFAULT_HOME_DIR)),
        None => Err(ClientError::config_invalid(
            HOME_VAR,
            "no home directory could be resolved; set it explicitly",
        )),
    }
}

// Unset is fine; set-but-blank is a configuration mistake.
fn non_blank<F>(lookup: &F, name: &str) -> ClientResult<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => {
            Err(ClientError::config_invalid(name, "value is blank"))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

fn path_or<F, D>(lookup: &F, name: &str, default: D) -> ClientResult<PathBuf>
where
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> PathBuf,
{
    match non_blank(lookup, name)? {
        Some(value) => absolutize_for(name, Path::new(&value)),
        None => Ok(default()),
    }
}

fn absolutize_for(name: &str, path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| {
            ClientError::config_invalid(
                name,
                &format!("cannot resolve `{}` against the working directory: {error}", path.display()),
            )
        })
}
