use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use relay_core::ExchangeId;

use super::types::{ExchangeConfig, RelayConfigFile};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No enabled exchanges in config")]
    NoEnabledExchanges,
    #[error("Exchange configured twice: {0}")]
    DuplicateExchange(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Load relay configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RelayConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RelayConfigFile, ConfigError> {
    let config: RelayConfigFile = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RelayConfigFile, ConfigError> {
    let default_config = include_str!("relay_config.json");
    load_config_from_str(default_config)
}

impl RelayConfigFile {
    /// Get only enabled exchanges
    pub fn enabled_exchanges(&self) -> Vec<&ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled).collect()
    }

    /// Get a specific exchange by ID (case-insensitive)
    pub fn get_exchange(&self, id: &str) -> Option<&ExchangeConfig> {
        let wanted = ExchangeId::new(id);
        self.exchanges
            .iter()
            .find(|e| ExchangeId::new(&e.id) == wanted)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_exchanges().is_empty() {
            return Err(ConfigError::NoEnabledExchanges);
        }

        let mut seen = HashSet::new();
        for exchange in &self.exchanges {
            if !seen.insert(ExchangeId::new(&exchange.id)) {
                return Err(ConfigError::DuplicateExchange(exchange.id.clone()));
            }
        }

        if self.batching.client_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batching.client_queue_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.feed.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feed.connect_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
