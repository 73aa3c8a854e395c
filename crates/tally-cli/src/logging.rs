use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILTER_VAR: &str = "TALLY_LOG";
const LOG_FORMAT_VAR: &str = "TALLY_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(setting) if setting.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Installs the process-wide subscriber. Logs always go to stderr so stdout
/// stays reserved for command output.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = LogFormat::from_setting(std::env::var(LOG_FORMAT_VAR).ok().as_deref());
    let registry = tracing_subscriber::registry().with(filter);

    // A subscriber installed earlier (e.g. by a test harness) wins.
    let _ = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init(),
    };
}
