use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::{Connection, params};
use tally_client::blob::LocalBlobStore;
use tally_client::config::AppConfig;
use tally_client::ledger::SqliteLedger;
use tally_client::notification::ObjectIdentity;
use tempfile::{Builder, TempDir};

pub struct Workspace {
    pub dir: TempDir,
    pub config: AppConfig,
}

pub fn workspace(prefix: &str) -> std::io::Result<Workspace> {
    workspace_with(prefix, &[])
}

pub fn workspace_with(prefix: &str, extra: &[(&str, String)]) -> std::io::Result<Workspace> {
    let dir = Builder::new().prefix(prefix).tempdir_in("/tmp")?;
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "TALLY_HOME".to_string(),
        dir.path().join("tally-home").display().to_string(),
    );
    vars.insert("TALLY_ENVIRONMENT".to_string(), "test".to_string());
    for (name, value) in extra {
        vars.insert((*name).to_string(), value.clone());
    }

    let config = AppConfig::from_lookup(|name| vars.get(name).cloned())
        .map_err(|error| std::io::Error::other(error.message))?;
    Ok(Workspace { dir, config })
}

/// Inserts `(date, amount, payment_method, description)` rows in order.
pub fn seed_ledger(config: &AppConfig, rows: &[(&str, &str, &str, &str)]) {
    let opened = SqliteLedger::open(&config.ledger_path);
    assert!(opened.is_ok());

    let connection = Connection::open(&config.ledger_path);
    assert!(connection.is_ok());
    if let Ok(connection) = connection {
        for (day, amount, method, description) in rows {
            let inserted = connection.execute(
                "INSERT INTO expense_transactions (transaction_date, amount, payment_method, description) VALUES (?1, ?2, ?3, ?4)",
                params![day, amount, method, description],
            );
            assert!(inserted.is_ok());
        }
    }
}

pub fn upload(
    config: &AppConfig,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
    body: &str,
) -> Option<PathBuf> {
    let store = LocalBlobStore::new(&config.blob_root);
    let identity = ObjectIdentity {
        bucket: bucket.to_string(),
        key: key.to_string(),
        version_id: version_id.map(str::to_string),
    };
    let written = store.put(&identity, body.as_bytes());
    assert!(written.is_ok());
    written.ok()
}
