use tally_client::ClientError;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "Reconciliation could not complete.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
    ];

    if let Some(run_id) = error
        .data
        .as_ref()
        .and_then(|data| data.get("run_id"))
        .and_then(|value| value.as_str())
    {
        lines.push(format!("  Run:      {run_id}"));
    }

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command; if it keeps failing, rerun with TALLY_LOG=debug.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}
