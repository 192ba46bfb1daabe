//! Configuration loading: `env > file > defaults`, matching the teacher's
//! `knhk-config::config::load_config` hierarchy.

use crate::schema::SpallocConfig;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration starting from defaults, overlaying a file (if given)
/// and then environment variables, then validate.
pub fn load_config(path: Option<&Path>) -> Result<SpallocConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(path)?,
        Some(path) => {
            return Err(ConfigError::Io(format!("config file not found: {}", path.display())))
        }
        None => SpallocConfig::default(),
    };

    crate::env::apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

pub fn load_from_file(path: &Path) -> Result<SpallocConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

pub fn validate_config(config: &SpallocConfig) -> Result<(), ConfigError> {
    if config.allocator.period_secs == 0 {
        return Err(ConfigError::Invalid("allocator.period must be > 0".into()));
    }
    if config.allocator.importance_span < 0.0 {
        return Err(ConfigError::Invalid("allocator.importance_span must be >= 0".into()));
    }
    if config.keepalive.min_secs > config.keepalive.max_secs {
        return Err(ConfigError::Invalid("keepalive.min must be <= keepalive.max".into()));
    }
    if config.transceiver.power_attempts == 0 || config.transceiver.fpga_attempts == 0 {
        return Err(ConfigError::Invalid(
            "transceiver.power_attempts and fpga_attempts must be >= 1".into(),
        ));
    }
    if config.db.lock_tries == 0 {
        return Err(ConfigError::Invalid("db.lock_tries must be >= 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        validate_config(&SpallocConfig::default()).unwrap();
    }

    #[test]
    fn bare_document_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spalloc.toml");
        std::fs::write(&path, "").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.allocator.period_secs, 5);
    }

    #[test]
    fn inverted_keepalive_bounds_are_rejected() {
        let mut config = SpallocConfig::default();
        config.keepalive.min_secs = 100;
        config.keepalive.max_secs = 10;
        assert!(validate_config(&config).is_err());
    }
}
