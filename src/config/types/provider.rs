//! Provider configuration types
//!
//! Configuration for the hosted LLM platform.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Selected platform
    #[serde(default)]
    pub platform: Platform,
    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            platform: Platform::default(),
            openai: None,
        }
    }
}

/// Hosted LLM platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// OpenAI-compatible chat completions API
    #[default]
    OpenAi,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::OpenAi => write!(f, "openai"),
        }
    }
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_openai_model")]
    pub default_model: String,
    /// Base URL
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Build a config from a bare API key, with defaults for everything else
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        OpenAiConfig {
            api_key: SecretString::from(api_key.into()),
            default_model: default_openai_model(),
            base_url: default_openai_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.platform, Platform::OpenAi);
        assert!(config.openai.is_none());
    }

    #[test]
    fn test_openai_config_from_key() {
        let config = OpenAiConfig::with_api_key("sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.default_model, "gpt-4o");
    }
}
