use scout_core::config::{GeneralConfig, LogFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment flag that forces JSON output regardless of config.
pub const PRODUCTION_ENV: &str = "SCOUT_PRODUCTION";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize logging with human-readable output.
///
/// `RUST_LOG` wins over `default_level` when set. Safe to call more than
/// once; only the first call installs a subscriber.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised (human-readable)");
}

/// Initialize logging with one JSON object per line.
pub fn init_logging_json(service_name: &str, default_level: &str) {
    fmt()
        .json()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised (json)");
}

/// Output format after applying the production override.
pub fn effective_format(config: &GeneralConfig) -> LogFormat {
    let production = std::env::var(PRODUCTION_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if production {
        LogFormat::Json
    } else {
        config.log_format
    }
}

/// Initialize logging from the `[general]` config section.
pub fn init_from(service_name: &str, config: &GeneralConfig) {
    match effective_format(config) {
        LogFormat::Pretty => init_logging(service_name, &config.log_level),
        LogFormat::Json => init_logging_json(service_name, &config.log_level),
    }
}
