//! Configuration loading for the replay binary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use market_replay::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! println!("replaying {} at {}x", config.simulation.ticker, config.simulation.speed);
//! ```

mod observability;
mod simulation;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replay::PlaybackSpeed;

pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use simulation::{DataConfig, SimulationSettings};

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Simulation run settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Candle data location.
    #[serde(default)]
    pub data: DataConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate `${VAR}` and `${VAR:-default}` references.
fn interpolate_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(re) = ENV_VAR_REGEX
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").ok())
    else {
        return input.to_string();
    };

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let sim = &config.simulation;

    if sim.ticker.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "simulation.ticker must not be empty".to_string(),
        ));
    }

    if sim.initial_balance <= rust_decimal::Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "simulation.initial_balance must be positive".to_string(),
        ));
    }

    PlaybackSpeed::new(sim.speed)
        .map_err(|e| ConfigError::ValidationError(format!("simulation.speed: {e}")))?;

    if sim.tick_budget == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.tick_budget must be positive".to_string(),
        ));
    }

    if sim.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.tick_interval_ms must be positive".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::market::CandleInterval;

    const YAML: &str = r#"
simulation:
  ticker: MSFT
  user: alice
  initial_balance: 25000
  speed: 20
  tick_interval_ms: 100
  interval: 1h
  seed: 7
data:
  dir: /tmp/candles
observability:
  logging:
    level: debug
    format: json
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simulation.ticker, "AAPL");
        assert_eq!(config.simulation.speed, 10);
        assert_eq!(config.simulation.tick_budget, 300);
        assert_eq!(config.simulation.interval, CandleInterval::OneDay);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_string() {
        let config = load_config_from_string(YAML).unwrap();
        assert_eq!(config.simulation.ticker, "MSFT");
        assert_eq!(config.simulation.user, "alice");
        assert_eq!(config.simulation.initial_balance, dec!(25000));
        assert_eq!(config.simulation.speed, 20);
        assert_eq!(config.simulation.tick_budget, 300);
        assert_eq!(config.simulation.interval, CandleInterval::OneHour);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.data.dir.to_str(), Some("/tmp/candles"));
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let yaml = YAML.replace("speed: 20", "speed: 12");
        let err = load_config_from_string(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("speed")));
    }

    #[test]
    fn test_non_positive_balance_rejected() {
        let yaml = YAML.replace("initial_balance: 25000", "initial_balance: 0");
        assert!(matches!(
            load_config_from_string(&yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_empty_ticker_rejected() {
        let yaml = YAML.replace("ticker: MSFT", "ticker: \"\"");
        assert!(load_config_from_string(&yaml).is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            load_config_from_string("simulation: [unclosed"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_default_interpolation() {
        let yaml = "simulation:\n  ticker: ${MARKET_REPLAY_TEST_UNSET_TICKER:-NVDA}\n  initial_balance: 1000\n";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.simulation.ticker, "NVDA");
    }

    #[test]
    fn test_unset_var_without_default_is_empty() {
        let out = interpolate_env_vars("a=${MARKET_REPLAY_TEST_UNSET_VAR}");
        assert_eq!(out, "a=");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.simulation.ticker, "MSFT");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some("/nonexistent/market-replay.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
