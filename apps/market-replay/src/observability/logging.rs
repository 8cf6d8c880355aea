//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Error type for tracing initialisation.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser error.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Build the filter: `RUST_LOG` if set, else the configured level.
///
/// # Errors
///
/// Returns `InvalidFilter` if the configured directive does not parse.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TracingError::InvalidFilter {
        directive: config.level.clone(),
        message: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let builder = tracing_subscriber::fmt().with_env_filter(build_filter(config)?);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| TracingError::SubscriberError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive_rejected() {
        // Only meaningful when RUST_LOG is unset in the test environment.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "market_replay=verbose".to_string(),
            format: LogFormat::Text,
        };
        assert!(matches!(
            build_filter(&config),
            Err(TracingError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_default_directive_parses() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }
}
