use std::io;

use serde::Serialize;
use serde_json::{Value, json};
use tally_client::{ClientError, SuccessEnvelope};

const JSON_VERSION: &str = "v1";

pub fn success_value(success: &SuccessEnvelope) -> Value {
    json!({
        "ok": true,
        "version": JSON_VERSION,
        "data": success.data.clone(),
    })
}

pub fn error_value(error: &ClientError) -> Value {
    let mut payload = json!({
        "error": {
            "code": error.code,
            "message": error.message,
            "recovery_steps": error.recovery_steps,
        }
    });
    if let Some(run_id) = error.data.as_ref().and_then(|data| data.get("run_id")) {
        payload["run_id"] = run_id.clone();
    }
    payload
}

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    serialize_json_pretty(&success_value(success))
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&error_value(error))
}

/// Single-line form used by `listen`, one object per notification.
pub fn render_line(value: &Value) -> io::Result<String> {
    serde_json::to_string(value).map_err(io::Error::other)
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
