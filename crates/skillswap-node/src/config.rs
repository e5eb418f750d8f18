//! Node configuration.
//!
//! Read from the JSON file named by `SKILLSWAP_CONFIG`; every field has a
//! default, so the file only lists what it changes.
//!
//! ```json
//! {
//!   "exchange": { "accounts": { "initial_credits": 100 } },
//!   "data_file": "skillswap-state.json",
//!   "log": { "filter": "info,skillswap_exchange=debug", "format": "json" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use skillswap_types::ExchangeConfig;

use crate::error::{NodeError, NodeResult};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SKILLSWAP_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub exchange: ExchangeConfig,
    /// Snapshot restored on start and written on shutdown. No persistence
    /// when unset.
    pub data_file: Option<String>,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl NodeConfig {
    /// Load from `SKILLSWAP_CONFIG`, or defaults when it is unset.
    ///
    /// # Errors
    /// `Config` if the named file cannot be read or parsed.
    pub fn from_env() -> NodeResult<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// # Errors
    /// `Config` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&raw).map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))
    }

    /// # Errors
    /// `Config` for malformed JSON or unknown enum values.
    pub fn parse(raw: &str) -> NodeResult<Self> {
        serde_json::from_str(raw).map_err(|e| NodeError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let config = NodeConfig::parse("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.exchange.matching.interval_secs, 900);
        assert_eq!(config.exchange.fraud.interval_secs, 3600);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.data_file.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = NodeConfig::parse(
            r#"{
                "exchange": { "accounts": { "initial_credits": 250 } },
                "data_file": "state.json",
                "log": { "format": "json" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.exchange.accounts.initial_credits, 250);
        assert_eq!(config.exchange.matching.expert_score, 90);
        assert_eq!(config.data_file.as_deref(), Some("state.json"));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn unknown_format_is_a_config_error() {
        let err = NodeConfig::parse(r#"{"log": {"format": "xml"}}"#).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
