//! Opening the ledger file and translating storage failures into client errors.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, ffi::ErrorCode};

use crate::{ClientError, ClientResult};

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Setup and migrations. Creates the file and its directory when missing.
    ReadWrite,
    /// Window reads during reconciliation. Never creates or writes.
    ReadOnly,
}

impl Access {
    fn flags(self) -> OpenFlags {
        match self {
            Self::ReadWrite => OpenFlags::default(),
            Self::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        }
    }
}

pub fn open_ledger(db_path: &Path, access: Access) -> ClientResult<Connection> {
    if access == Access::ReadWrite {
        prepare_ledger_directory(db_path)?;
    }

    let connection = Connection::open_with_flags(db_path, access.flags())
        .map_err(|error| storage_failure(db_path, &error))?;
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .map_err(|error| storage_failure(db_path, &error))?;
    Ok(connection)
}

pub fn io_failure(path: &Path, error: &io::Error) -> ClientError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => {
            ClientError::ledger_init_permission_denied(path, &error.to_string())
        }
        _ => ClientError::ledger_init_failed(path, &error.to_string()),
    }
}

pub fn storage_failure(db_path: &Path, error: &rusqlite::Error) -> ClientError {
    match error.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            ClientError::ledger_locked(db_path)
        }
        Some(ErrorCode::NotADatabase) => ClientError::ledger_corrupt(db_path),
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly | ErrorCode::PermissionDenied) => {
            ClientError::ledger_init_permission_denied(db_path, &error.to_string())
        }
        _ => ClientError::ledger_init_failed(db_path, &error.to_string()),
    }
}

fn prepare_ledger_directory(db_path: &Path) -> ClientResult<()> {
    let Some(parent) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|error| io_failure(parent, &error))?;
    restrict_to_owner(parent);
    Ok(())
}

// Best effort: a shared parent the user does not own keeps its mode.
#[cfg(unix)]
fn restrict_to_owner(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::{Access, io_failure, open_ledger, storage_failure};

    #[test]
    fn permission_denied_io_is_reported_as_such() {
        let error = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let mapped = io_failure(Path::new("/tmp/tally-home"), &error);
        assert_eq!(mapped.code, "ledger_init_permission_denied");

        let error = std::io::Error::from(std::io::ErrorKind::NotFound);
        let mapped = io_failure(Path::new("/tmp/tally-home"), &error);
        assert_eq!(mapped.code, "ledger_init_failed");
    }

    #[test]
    fn read_write_access_creates_missing_directories() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let db_path = temp.path().join("a").join("b").join("ledger.db");
            assert!(open_ledger(&db_path, Access::ReadWrite).is_ok());
            assert!(db_path.exists());
        }
    }

    #[test]
    fn read_only_access_never_creates_the_file() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let db_path = temp.path().join("ledger.db");
            let result = open_ledger(&db_path, Access::ReadOnly);
            assert!(result.is_err());
            assert!(!db_path.exists());
        }
    }

    #[test]
    fn writes_through_read_only_access_are_refused() {
        let temp = TempDir::new();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let db_path = temp.path().join("ledger.db");
            let writable = open_ledger(&db_path, Access::ReadWrite);
            assert!(writable.is_ok());
            if let Ok(writable) = writable {
                assert!(writable.execute_batch("CREATE TABLE t(x INTEGER);").is_ok());
            }

            let readonly = open_ledger(&db_path, Access::ReadOnly);
            assert!(readonly.is_ok());
            if let Ok(readonly) = readonly {
                let written = readonly.execute_batch("INSERT INTO t VALUES (1);");
                assert!(written.is_err());
                if let Err(error) = written {
                    assert_eq!(
                        storage_failure(&db_path, &error).code,
                        "ledger_init_permission_denied"
                    );
                }
            }
        }
    }
}
