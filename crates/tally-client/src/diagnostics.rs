use serde::Serialize;
use tracing::warn;

/// Serializes `value` as compact JSON for log fields.
///
/// Returns an empty string when the value cannot be serialized.
pub fn to_log_string<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(serialized) => serialized,
        Err(error) => {
            warn!(
                value_type = std::any::type_name::<T>(),
                error = %error,
                "could not serialize value for logging"
            );
            String::new()
        }
    }
}
