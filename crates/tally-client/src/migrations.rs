use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");

pub const REQUIRED_INDEX_NAMES: [&str; 1] = ["idx_expense_transactions_date"];

pub const REQUIRED_META_KEYS: [(&str, &str); 2] = [
    ("schema_version", "v1"),
    ("ledger_contract_version", "v1"),
];

/// `PRAGMA user_version` once every migration above has been applied.
pub const EXPECTED_USER_VERSION: i64 = 1;

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(BOOTSTRAP_SQL)]);
    migrations.to_latest(conn)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{EXPECTED_USER_VERSION, run_pending};

    #[test]
    fn migrations_reach_expected_user_version() {
        let connection = Connection::open_in_memory();
        assert!(connection.is_ok());
        if let Ok(mut conn) = connection {
            assert!(run_pending(&mut conn).is_ok());
            let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0));
            assert!(matches!(version, Ok(value) if value == EXPECTED_USER_VERSION));

            // Re-running is a no-op.
            assert!(run_pending(&mut conn).is_ok());
        }
    }
}
