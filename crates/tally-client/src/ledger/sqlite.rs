use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use tracing::debug;

use crate::ledger::connection::{Access, open_ledger, storage_failure};
use crate::ledger::{LedgerScope, PaymentMethod, PersistedExpenseTransaction, TransactionReader};
use crate::setup::ensure_ledger_ready;
use crate::statement::CURRENCY_SCALE;
use crate::{ClientError, ClientResult};

const SELECT_WINDOW_SQL: &str = "
SELECT id, transaction_date, amount, payment_method, description
FROM expense_transactions
WHERE transaction_date BETWEEN ?1 AND ?2
ORDER BY transaction_date ASC, id ASC
";

/// Expense ledger stored in a local SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    db_path: PathBuf,
}

struct StoredRow {
    id: i64,
    transaction_date: String,
    amount: String,
    payment_method: String,
    description: String,
}

impl SqliteLedger {
    /// Opens the ledger, creating the schema if it does not exist yet.
    pub fn open(db_path: &Path) -> ClientResult<Self> {
        ensure_ledger_ready(db_path)?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }
}

impl TransactionReader for SqliteLedger {
    fn read_transactions(
        &self,
        scope: &LedgerScope,
    ) -> ClientResult<Vec<PersistedExpenseTransaction>> {
        let connection = open_ledger(&self.db_path, Access::ReadOnly)?;
        let mut statement = connection
            .prepare(SELECT_WINDOW_SQL)
            .map_err(|error| storage_failure(&self.db_path, &error))?;

        let from = scope.from.format("%Y-%m-%d").to_string();
        let to = scope.to.format("%Y-%m-%d").to_string();
        let rows = statement
            .query_map(params![from, to], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    transaction_date: row.get(1)?,
                    amount: row.get(2)?,
                    payment_method: row.get(3)?,
                    description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })
            .map_err(|error| storage_failure(&self.db_path, &error))?;

        let mut transactions = Vec::new();
        for row in rows {
            let stored = row.map_err(|error| storage_failure(&self.db_path, &error))?;
            transactions.push(decode_stored_row(&self.db_path, stored)?);
        }

        debug!(
            from = %scope.from,
            to = %scope.to,
            count = transactions.len(),
            "read ledger window"
        );
        Ok(transactions)
    }
}

fn decode_stored_row(db_path: &Path, stored: StoredRow) -> ClientResult<PersistedExpenseTransaction> {
    let transaction_date = NaiveDate::parse_from_str(stored.transaction_date.trim(), "%Y-%m-%d")
        .map_err(|_| {
            ClientError::ledger_row_invalid(
                db_path,
                stored.id,
                &format!("transaction_date `{}` is not YYYY-MM-DD", stored.transaction_date),
            )
        })?;

    let mut amount = Decimal::from_str(stored.amount.trim()).map_err(|_| {
        ClientError::ledger_row_invalid(
            db_path,
            stored.id,
            &format!("amount `{}` is not a decimal number", stored.amount),
        )
    })?;
    if amount.scale() > CURRENCY_SCALE {
        return Err(ClientError::ledger_row_invalid(
            db_path,
            stored.id,
            &format!("amount `{}` has more than {CURRENCY_SCALE} decimal places", stored.amount),
        ));
    }
    amount.rescale(CURRENCY_SCALE);

    let payment_method = PaymentMethod::from_stored(&stored.payment_method).ok_or_else(|| {
        ClientError::ledger_row_invalid(
            db_path,
            stored.id,
            &format!("payment_method `{}` is not recognised", stored.payment_method),
        )
    })?;

    Ok(PersistedExpenseTransaction {
        id: stored.id,
        transaction_date,
        amount,
        payment_method,
        description: stored.description,
    })
}
