//! Logging setup.
//!
//! Logs go to stderr; stdout carries only the command's JSON output.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,hlsign=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// JSON when `RUST_ENV=production`, text otherwise.
    pub fn from_env() -> Self {
        match std::env::var("RUST_ENV") {
            Ok(env) if env == "production" => Self::Json,
            _ => Self::Text,
        }
    }
}

pub fn init_logging(format: LogFormat) -> CliResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };
    result.map_err(|e| CliError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_second_init_is_an_error() {
        // Only one global subscriber can be installed per process.
        let _ = init_logging(LogFormat::Text);
        assert!(matches!(
            init_logging(LogFormat::Json),
            Err(CliError::Logging(_))
        ));
    }
}
