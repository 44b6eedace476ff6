//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ControlConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ControlConfig, ConfigError> {
    let config: ControlConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply command-line overrides, then validate the merged result.
pub fn apply_overrides(
    mut config: ControlConfig,
    bind_address: Option<String>,
    production: bool,
) -> Result<ControlConfig, ConfigError> {
    if let Some(bind_address) = bind_address {
        config.listener.bind_address = bind_address;
    }
    if production {
        config.observability.json_logs = true;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config("[streaming]\nsink_capacity = 4\n").unwrap();
        assert_eq!(config.streaming.sink_capacity, 4);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[listener\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_problems() {
        let err = parse_config("[streaming]\nsink_capacity = 0\nsend_timeout_ms = 0\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Validation failed: "));
        assert!(msg.contains("streaming.sink_capacity"));
        assert!(msg.contains("streaming.send_timeout_ms"));
    }

    #[test]
    fn test_overrides_are_validated() {
        let err = apply_overrides(ControlConfig::default(), Some("not-an-address".into()), false)
            .unwrap_err();
        assert!(err.to_string().contains("listener.bind_address"));

        let config =
            apply_overrides(ControlConfig::default(), Some("127.0.0.1:7000".into()), true).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
