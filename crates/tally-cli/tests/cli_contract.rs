use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rusqlite::{Connection, params};
use serde_json::Value;
use tempfile::{Builder, TempDir};

struct CliRun {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

fn test_home() -> TempDir {
    let created = Builder::new().prefix("tally-cli-test-").tempdir();
    assert!(created.is_ok());
    match created {
        Ok(dir) => dir,
        Err(error) => panic!("temp dir: {error}"),
    }
}

fn command_in(home: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tally"));
    command.args(args);
    command.env("TALLY_HOME", home);
    command.env("TALLY_ENVIRONMENT", "test");
    command.env("TALLY_LOG", "warn");
    command.env_remove("TALLY_LEDGER_PATH");
    command.env_remove("TALLY_BLOB_ROOT");
    command.env_remove("TALLY_REPORT_DIR");
    command.env_remove("TALLY_CSV_PATH");
    command.env_remove("TALLY_LOG_FORMAT");
    command
}

fn run_with(mut command: Command, input: Option<&str>) -> CliRun {
    command.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let child_spawn = command.spawn();
    assert!(child_spawn.is_ok());
    if let Ok(mut child) = child_spawn {
        if let Some(body) = input
            && let Some(mut pipe) = child.stdin.take()
        {
            assert!(pipe.write_all(body.as_bytes()).is_ok());
        }

        let output = child.wait_with_output();
        assert!(output.is_ok());
        if let Ok(result) = output {
            return CliRun {
                code: result.status.code(),
                stdout: String::from_utf8_lossy(&result.stdout).to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).to_string(),
            };
        }
    }

    CliRun {
        code: None,
        stdout: String::new(),
        stderr: String::new(),
    }
}

fn run_cli(home: &Path, args: &[&str], input: Option<&str>) -> CliRun {
    run_with(command_in(home, args), input)
}

fn parse_json(body: &str) -> Value {
    let parsed = serde_json::from_str::<Value>(body);
    assert!(parsed.is_ok(), "not JSON: {body}");
    parsed.unwrap_or(Value::Null)
}

/// Opens (and so bootstraps) the ledger through the binary, then inserts rows.
fn seed_ledger(home: &Path, rows: &[(&str, &str, &str, &str)]) {
    let bootstrap = run_cli(home, &["listen"], Some(""));
    assert_eq!(bootstrap.code, Some(0));

    let connection = Connection::open(home.join("ledger.db"));
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

fn upload(home: &Path, bucket: &str, key: &str, body: &str) -> PathBuf {
    let path = home.join("blobs").join(bucket).join(key);
    if let Some(parent) = path.parent() {
        assert!(fs::create_dir_all(parent).is_ok());
    }
    assert!(fs::write(&path, body).is_ok());
    path
}

fn notification(bucket: &str, key: &str) -> String {
    format!(
        "{{\"Records\":[{{\"eventName\":\"ObjectCreated:Put\",\"s3\":{{\"bucket\":{{\"name\":\"{bucket}\"}},\"object\":{{\"key\":\"{key}\"}}}}}}]}}"
    )
}

const STATEMENT: &str = "\
date,amount,description,reference
2024-01-05,-12.50,Coffee Shop,POS
2024-01-06,-40.00,ATM WITHDRAWAL,ATM
";

#[test]
fn root_command_prints_short_help() {
    let home = test_home();
    let run = run_with(
        {
            let mut command = Command::new(env!("CARGO_BIN_EXE_tally"));
            command.env("TALLY_HOME", home.path());
            command
        },
        None,
    );
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.starts_with("tally - reconcile bank statements"));
}

#[test]
fn top_level_help_lists_commands_and_configuration() {
    let home = test_home();
    let run = run_cli(home.path(), &["--help"], None);
    assert_eq!(run.code, Some(0));
    for needle in ["tally reconcile <path>", "tally listen", "TALLY_BLOB_ROOT", "TALLY_LOG"] {
        assert!(run.stdout.contains(needle), "missing {needle}");
    }
}

#[test]
fn process_help_describes_notification_shape() {
    let home = test_home();
    let run = run_cli(home.path(), &["process", "--help"], None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.contains("Notification shape:"));
    assert!(run.stdout.contains(".versions/<versionId>/<key>"));
}

#[test]
fn process_without_records_is_idle() {
    let home = test_home();
    let run = run_cli(home.path(), &["process", "--json"], Some("{\"Records\":[]}"));
    assert_eq!(run.code, Some(0));

    let payload = parse_json(&run.stdout);
    assert_eq!(payload["ok"], Value::Bool(true));
    assert_eq!(payload["version"], "v1");
    assert_eq!(payload["data"]["outcome"], "idle");
    assert_eq!(payload["data"]["environment"], "test");
    assert!(
        payload["data"]["run_id"]
            .as_str()
            .is_some_and(|id| id.starts_with("run_"))
    );
}

#[test]
fn process_reconciles_uploaded_statement() {
    let home = test_home();
    seed_ledger(
        home.path(),
        &[
            ("2024-01-05", "-12.50", "debit_card", "coffee"),
            ("2024-01-07", "-8.00", "cash", "parking"),
        ],
    );
    upload(home.path(), "statements", "2024/jan.csv", STATEMENT);

    let run = run_cli(
        home.path(),
        &["process", "--json"],
        Some(&notification("statements", "2024/jan.csv")),
    );
    assert_eq!(run.code, Some(0), "stderr: {}", run.stderr);

    let payload = parse_json(&run.stdout);
    let data = &payload["data"];
    assert_eq!(data["outcome"], "reconciled");
    assert_eq!(data["identity"]["bucket"], "statements");
    assert_eq!(data["summary"]["signature_mode"], "payment_method");
    assert_eq!(data["summary"]["matched"], 1);
    assert_eq!(data["summary"]["bank_only"], 1);
    assert_eq!(data["scope"]["from"], "2024-01-05");
    assert_eq!(data["scope"]["to"], "2024-01-06");
    // The parking row falls outside the statement's date range.
    assert_eq!(data["summary"]["ledger_only"], 0);
    assert_eq!(data["discrepancies"][0]["statement_row"], 3);
}

#[test]
fn process_text_output_names_discrepancies() {
    let home = test_home();
    seed_ledger(home.path(), &[]);
    upload(home.path(), "statements", "jan.csv", STATEMENT);

    let notification_path = home.path().join("event.json");
    assert!(fs::write(&notification_path, notification("statements", "jan.csv")).is_ok());
    let path_arg = notification_path.display().to_string();

    let run = run_cli(home.path(), &["process", path_arg.as_str()], None);
    assert_eq!(run.code, Some(0));
    assert!(run.stdout.starts_with("Reconciliation completed with discrepancies."));
    assert!(run.stdout.contains("statements/jan.csv"));
    assert!(run.stdout.contains("Discrepancies (2):"));
}

#[test]
fn missing_object_fails_with_run_id() {
    let home = test_home();
    let run = run_cli(
        home.path(),
        &["process", "--json"],
        Some(&notification("statements", "absent.csv")),
    );
    assert_eq!(run.code, Some(1));

    let payload = parse_json(&run.stdout);
    assert_eq!(payload["error"]["code"], "object_not_found");
    assert!(payload["error"]["recovery_steps"].is_array());
    assert!(payload["run_id"].as_str().is_some_and(|id| id.starts_with("run_")));
}

#[test]
fn malformed_notification_uses_text_error_contract() {
    let home = test_home();
    let run = run_cli(home.path(), &["process"], Some("{not json"));
    assert_eq!(run.code, Some(1));
    assert!(run.stdout.contains("Reconciliation could not complete."));
    assert!(run.stdout.contains("  Error:    notification_malformed"));
    assert!(run.stdout.contains("What to do next:"));
}

#[test]
fn listen_processes_every_line_and_survives_bad_ones() {
    let home = test_home();
    seed_ledger(home.path(), &[("2024-01-05", "-12.50", "debit_card", "coffee")]);
    upload(home.path(), "statements", "jan.csv", STATEMENT);

    let input = format!(
        "{}\n\nnot json\n{}\n{{}}\n",
        notification("statements", "jan.csv"),
        notification("statements", "missing.csv"),
    );
    let run = run_cli(home.path(), &["listen", "--json"], Some(&input));
    assert_eq!(run.code, Some(0));

    let lines: Vec<Value> = run.stdout.lines().map(parse_json).collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["data"]["outcome"], "reconciled");
    assert_eq!(lines[1]["error"]["code"], "notification_malformed");
    assert_eq!(lines[2]["error"]["code"], "object_not_found");
    assert_eq!(lines[3]["data"]["outcome"], "idle");
}

#[test]
fn reconcile_local_statement_with_window() {
    let home = test_home();
    seed_ledger(
        home.path(),
        &[
            ("2024-01-05", "-12.50", "debit_card", "coffee"),
            ("2024-01-20", "-30.00", "credit_card", "books"),
            ("2024-02-02", "-9.00", "cash", "lunch"),
        ],
    );
    let statement = home.path().join("statement.csv");
    assert!(fs::write(&statement, STATEMENT).is_ok());
    let statement_arg = statement.display().to_string();

    let run = run_cli(
        home.path(),
        &[
            "reconcile",
            statement_arg.as_str(),
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--json",
        ],
        None,
    );
    assert_eq!(run.code, Some(0), "stderr: {}", run.stderr);

    let payload = parse_json(&run.stdout);
    let summary = &payload["data"]["summary"];
    assert_eq!(summary["matched"], 1);
    assert_eq!(summary["bank_only"], 1);
    assert_eq!(summary["ledger_only"], 1);
    assert_eq!(payload["data"]["discrepancies"][1]["ledger_id"], 2);
}

#[test]
fn reconcile_defaults_to_configured_csv_path() {
    let home = test_home();
    let statement = home.path().join("default.csv");
    assert!(fs::write(&statement, STATEMENT).is_ok());

    let mut command = command_in(home.path(), &["reconcile", "--json"]);
    command.env("TALLY_CSV_PATH", &statement);
    let run = run_with(command, None);
    assert_eq!(run.code, Some(0));

    let payload = parse_json(&run.stdout);
    assert_eq!(payload["data"]["summary"]["bank_count"], 2);
    assert_eq!(
        payload["data"]["path"].as_str(),
        Some(statement.display().to_string().as_str())
    );
}

#[test]
fn half_open_window_is_a_usage_error() {
    let home = test_home();
    let run = run_cli(
        home.path(),
        &["reconcile", "x.csv", "--from", "2024-01-01", "--json"],
        None,
    );
    assert_eq!(run.code, Some(1));

    let payload = parse_json(&run.stdout);
    assert_eq!(payload["error"]["code"], "invalid_argument");
    assert!(
        payload["error"]["recovery_steps"][0]
            .as_str()
            .is_some_and(|step| step.contains("tally reconcile --help"))
    );
}

#[test]
fn blank_environment_is_a_config_error() {
    let home = test_home();
    let mut command = command_in(home.path(), &["process", "--json"]);
    command.env("TALLY_ENVIRONMENT", "   ");
    let run = run_with(command, Some("{\"Records\":[]}"));
    assert_eq!(run.code, Some(1));

    let payload = parse_json(&run.stdout);
    assert_eq!(payload["error"]["code"], "config_invalid");
}

#[test]
fn report_dir_receives_run_json() {
    let home = test_home();
    let reports = home.path().join("reports");
    let statement = home.path().join("statement.csv");
    assert!(fs::write(&statement, STATEMENT).is_ok());
    let statement_arg = statement.display().to_string();

    let mut command = command_in(home.path(), &["reconcile", statement_arg.as_str(), "--json"]);
    command.env("TALLY_REPORT_DIR", &reports);
    let run = run_with(command, None);
    assert_eq!(run.code, Some(0));

    let payload = parse_json(&run.stdout);
    let run_id = payload["data"]["run_id"].as_str().unwrap_or_default();
    let written = fs::read_to_string(reports.join(format!("{run_id}.json")));
    assert!(written.is_ok());
    if let Ok(body) = written {
        assert_eq!(parse_json(&body)["run_id"], run_id);
    }
}

#[test]
fn json_logs_go_to_stderr_only() {
    let home = test_home();
    let mut command = command_in(home.path(), &["process", "--json"]);
    command.env("TALLY_LOG", "info");
    command.env("TALLY_LOG_FORMAT", "json");
    let run = run_with(command, Some("{\"Records\":[]}"));
    assert_eq!(run.code, Some(0));

    parse_json(&run.stdout);
    let first_log = run.stderr.lines().next().unwrap_or_default();
    assert!(parse_json(first_log)["level"].is_string());
}

#[test]
fn closed_stdout_pipe_does_not_panic() {
    let home = test_home();
    let statement = home.path().join("statement.csv");
    assert!(fs::write(&statement, STATEMENT).is_ok());
    let statement_arg = statement.display().to_string();

    let mut producer = command_in(home.path(), &["reconcile", statement_arg.as_str()]);
    producer.stdin(Stdio::null());
    producer.stdout(Stdio::piped());
    producer.stderr(Stdio::piped());

    let spawned = producer.spawn();
    assert!(spawned.is_ok());
    if let Ok(mut child) = spawned {
        if let Some(stdout_pipe) = child.stdout.take() {
            let mut reader = BufReader::new(stdout_pipe);
            let mut first_line = String::new();
            assert!(reader.read_line(&mut first_line).is_ok());
            drop(reader);
        }

        let status = child.wait();
        assert!(status.is_ok());

        if let Some(mut stderr_pipe) = child.stderr.take() {
            let mut stderr_text = String::new();
            assert!(stderr_pipe.read_to_string(&mut stderr_text).is_ok());
            assert!(!stderr_text.contains("panicked"));
        }
    }
}
