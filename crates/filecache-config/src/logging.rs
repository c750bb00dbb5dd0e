//! Centralized logging initialization with environment variable support

use crate::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_LEVEL`: Override the configured log level
/// - `LOG_FORMAT`: Override the configured format (json, pretty)
///
/// Returns `false` when a global subscriber was already installed.
///
/// ```bash
/// RUST_LOG=filecache=trace cargo test -p filecache
/// ```
pub fn initialize(config: &LoggingConfig) -> bool {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| config.level.clone());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()));

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|f| parse_format(&f))
        .unwrap_or(config.format);

    // Always log to stderr so stdout stays usable for program output
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
    }
}

fn parse_format(value: &str) -> Option<LogFormat> {
    match value.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "human" => Some(LogFormat::Pretty),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("JSON"), Some(LogFormat::Json));
        assert_eq!(parse_format("human"), Some(LogFormat::Pretty));
        assert_eq!(parse_format("xml"), None);
    }

    #[test]
    fn test_initialize_twice_is_harmless() {
        let config = LoggingConfig::default();
        initialize(&config);
        assert!(!initialize(&config));
    }
}
