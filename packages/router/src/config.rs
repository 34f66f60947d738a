//! Router configuration

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration is not valid JSON for [`RouterConfig`]
    #[error("failed to parse router config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("invalid router config field `{field}`: {reason}")]
    InvalidField {
        /// Offending field
        field: &'static str,
        /// Reason for error
        reason: String,
    },
}

/// The configuration for the router.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::module_name_repetitions)]
pub struct RouterConfig {
    /// Longest accepted timeout for sent packets, in seconds
    #[serde(default = "default_max_timeout_duration")]
    pub max_timeout_duration: u64,
    /// The log level for the embedding service.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Payloads a packet must carry to be dispatched
    #[serde(default = "default_max_payloads_per_packet")]
    pub max_payloads_per_packet: usize,
}

const fn default_max_timeout_duration() -> u64 {
    86_400
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_max_payloads_per_packet() -> usize {
    1
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_timeout_duration: default_max_timeout_duration(),
            log_level: default_log_level(),
            max_payloads_per_packet: default_max_payloads_per_packet(),
        }
    }
}

impl RouterConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a field is invalid
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field values
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidField`] naming the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_timeout_duration == 0 {
            return Err(ConfigError::InvalidField {
                field: "max_timeout_duration",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_payloads_per_packet == 0 {
            return Err(ConfigError::InvalidField {
                field: "max_payloads_per_packet",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the log level for the embedding service.
    #[must_use]
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }
}
