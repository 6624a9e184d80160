//! Configuration types module

pub mod provider;
pub mod storage;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Provider configuration (hosted LLM platform)
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Storage configuration (vector store + embeddings)
    #[serde(default)]
    pub storage: storage::StorageConfig,

    /// Warehouse configuration for the SQL generation PoC
    pub warehouse: Option<WarehouseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            agent: AgentConfig::default(),
            provider: provider::ProviderConfig::default(),
            storage: storage::StorageConfig::default(),
            warehouse: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and files
    ///
    /// Layering: defaults < config file (if present) < environment overrides.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Default chat model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// System prompt for the chat loop
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// How many memories to recall per user turn
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            model: default_model(),
            system_prompt: default_system_prompt(),
            recall_limit: default_recall_limit(),
            verbose: false,
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful engineering assistant. Be concise and practical.".to_string()
}

fn default_recall_limit() -> usize {
    5
}

/// Warehouse configuration for the SQL generation PoC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse connection URL
    #[serde(skip_serializing, default = "default_secret")]
    pub url: SecretString,
    /// Connection timeout in seconds
    #[serde(default = "default_warehouse_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_warehouse_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.model, "gpt-4o");
        assert_eq!(config.agent.recall_limit, 5);
        assert!(config.warehouse.is_none());
    }
}
