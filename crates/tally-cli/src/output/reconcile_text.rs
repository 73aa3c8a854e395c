use std::io;

use serde_json::{Map, Value};

use super::format::{self, Column};

const DISCREPANCY_COLUMNS: [Column<'static>; 6] = [
    Column::left("Side"),
    Column::left("Date"),
    Column::right("Amount"),
    Column::left("Description"),
    Column::left("Source"),
    Column::left("Reason"),
];

const ISSUE_COLUMNS: [Column<'static>; 4] = [
    Column::right("Row"),
    Column::left("Field"),
    Column::left("Code"),
    Column::left("Description"),
];

/// Renders the `data` payload shared by `process` and `reconcile`.
pub fn render_reconcile_data(data: &Value) -> io::Result<String> {
    let outcome = data
        .get("outcome")
        .and_then(Value::as_str)
        .ok_or_else(|| io::Error::other("reconciliation output requires outcome"))?;

    let mut lines = vec![headline(outcome, data)];
    lines.push(String::new());

    let mut entries = vec![
        ("Run:", get_str(data, "run_id").to_string()),
        ("Environment:", get_str(data, "environment").to_string()),
    ];
    if let Some(source) = source_label(data) {
        entries.push(("Statement:", source));
    }
    if let Some(window) = window_label(data) {
        entries.push(("Ledger window:", window));
    }
    lines.extend(format::key_value_rows(&entries, 2));

    if outcome != "reconciled" {
        lines.push(String::new());
        lines.push(get_str(data, "message").to_string());
        return Ok(lines.join("\n"));
    }

    if let Some(statement) = data.get("statement").and_then(Value::as_object) {
        lines.push(String::new());
        lines.push("Statement rows:".to_string());
        lines.extend(format::key_value_rows(
            &[
                ("Read:", get_i64(statement, "rows_read").to_string()),
                ("Valid:", get_i64(statement, "rows_valid").to_string()),
                ("Invalid:", get_i64(statement, "rows_invalid").to_string()),
                ("Blank:", get_i64(statement, "rows_blank").to_string()),
            ],
            2,
        ));
    }

    if let Some(summary) = data.get("summary").and_then(Value::as_object) {
        lines.push(String::new());
        lines.push("Summary:".to_string());
        lines.extend(format::key_value_rows(
            &[
                ("Matched by:", get_map_str(summary, "signature_mode").to_string()),
                ("Statement:", get_i64(summary, "bank_count").to_string()),
                ("Ledger:", get_i64(summary, "ledger_count").to_string()),
                ("Matched:", get_i64(summary, "matched").to_string()),
                ("Statement only:", get_i64(summary, "bank_only").to_string()),
                ("Ledger only:", get_i64(summary, "ledger_only").to_string()),
            ],
            2,
        ));
    }

    let width = format::terminal_width();
    let discrepancies = rows_of(data, "discrepancies");
    lines.push(String::new());
    if discrepancies.is_empty() {
        lines.push("No discrepancies: the statement and ledger agree.".to_string());
    } else {
        lines.push(format!("Discrepancies ({}):", discrepancies.len()));
        let rows: Vec<Vec<String>> = discrepancies.iter().map(discrepancy_cells).collect();
        lines.extend(format::render_table_or_blocks(
            &DISCREPANCY_COLUMNS,
            &rows,
            width,
            "Discrepancy",
        ));
    }

    let issues = rows_of(data, "issues");
    if !issues.is_empty() {
        lines.push(String::new());
        lines.push(format!("Skipped statement rows ({}):", issues.len()));
        let rows: Vec<Vec<String>> = issues.iter().map(issue_cells).collect();
        lines.extend(format::render_table_or_blocks(
            &ISSUE_COLUMNS,
            &rows,
            width,
            "Row issue",
        ));
        let truncated = data
            .get("statement")
            .and_then(|statement| statement.get("issues_truncated"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if truncated {
            lines.push("  (more rows were skipped than are listed)".to_string());
        }
    }

    Ok(lines.join("\n"))
}

fn headline(outcome: &str, data: &Value) -> String {
    match outcome {
        "idle" => "Nothing to reconcile.".to_string(),
        "failed" => "Reconciliation failed.".to_string(),
        _ => {
            let balanced = rows_of(data, "discrepancies").is_empty();
            if balanced {
                "Reconciliation completed: balanced.".to_string()
            } else {
                "Reconciliation completed with discrepancies.".to_string()
            }
        }
    }
}

fn source_label(data: &Value) -> Option<String> {
    if let Some(identity) = data.get("identity").and_then(Value::as_object) {
        let bucket = get_map_str(identity, "bucket");
        let key = get_map_str(identity, "key");
        return Some(match identity.get("version_id").and_then(Value::as_str) {
            Some(version) => format!("{bucket}/{key} (version {version})"),
            None => format!("{bucket}/{key}"),
        });
    }
    data.get("path").and_then(Value::as_str).map(str::to_string)
}

fn window_label(data: &Value) -> Option<String> {
    let scope = data.get("scope").and_then(Value::as_object)?;
    Some(format!(
        "{} to {}",
        get_map_str(scope, "from"),
        get_map_str(scope, "to")
    ))
}

fn discrepancy_cells(row: &Value) -> Vec<String> {
    let side = match get_str(row, "side") {
        "bank_only" => "statement",
        "ledger_only" => "ledger",
        other => other,
    };
    let source = if let Some(statement_row) = row.get("statement_row").and_then(Value::as_i64) {
        format!("row {statement_row}")
    } else if let Some(ledger_id) = row.get("ledger_id").and_then(Value::as_i64) {
        format!("ledger #{ledger_id}")
    } else {
        String::new()
    };

    vec![
        side.to_string(),
        get_str(row, "transaction_date").to_string(),
        get_str(row, "amount").to_string(),
        get_str(row, "description").to_string(),
        source,
        get_str(row, "reason").replace('_', " "),
    ]
}

fn issue_cells(issue: &Value) -> Vec<String> {
    let row = issue
        .get("row")
        .and_then(Value::as_i64)
        .map(|value| value.to_string())
        .unwrap_or_default();
    vec![
        row,
        get_str(issue, "field").to_string(),
        get_str(issue, "code").to_string(),
        get_str(issue, "description").to_string(),
    ]
}

fn rows_of<'a>(data: &'a Value, field: &str) -> &'a [Value] {
    data.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn get_str<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("")
}

fn get_map_str<'a>(map: &'a Map<String, Value>, field: &str) -> &'a str {
    map.get(field).and_then(Value::as_str).unwrap_or("")
}

fn get_i64(map: &Map<String, Value>, field: &str) -> i64 {
    map.get(field).and_then(Value::as_i64).unwrap_or(0)
}
