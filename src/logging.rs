//! Structured logging infrastructure.
//!
//! Built on `tracing` and `tracing-subscriber`: environment-based filtering
//! through `RUST_LOG`, with the configured level as the fallback, and three
//! output formats. Initialization is idempotent so tests and embedding code
//! can call it freely.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::RelayConfig;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed with colors, for development.
    #[default]
    Pretty,
    /// Compact without colors, for production.
    Compact,
    /// JSON for log aggregation.
    Json,
}

/// Initialize logging from the relay configuration.
pub fn init_from_config(config: &RelayConfig) -> Result<(), String> {
    let level = parse_log_level(&config.application.log_level)?;
    let format = parse_output_format(&config.application.log_format)?;
    init(level, format)
}

/// Initialize logging with an explicit level and format.
///
/// Idempotent: if a global subscriber is already set this returns `Ok(())`,
/// which is the expected situation in tests.
pub fn init(level: Level, format: OutputFormat) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let result = match format {
        OutputFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().pretty().with_filter(env_filter))
            .try_init(),
        OutputFormat::Compact => tracing_subscriber::registry()
            .with(fmt::layer().compact().with_ansi(false).with_filter(env_filter))
            .try_init(),
        OutputFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_filter(env_filter))
            .try_init(),
    };

    result.or_else(|e| {
        if e.to_string().contains("already been set") {
            Ok(())
        } else {
            Err(format!("Failed to initialize logging: {e}"))
        }
    })
}

/// Parse a log level string into a tracing [`Level`].
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        )),
    }
}

/// Parse a log format string into an [`OutputFormat`].
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid log format '{format}'. Must be one of: pretty, compact, json"
        )),
    }
}
