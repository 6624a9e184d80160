//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env for backward compat)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    // Apply environment variable overrides (highest precedence)
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        // Parse as JSON5 (more lenient than strict JSON)
        json5::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// This loads `.env` (if present) and overlays any set environment
/// variables onto the config. Env vars have the highest precedence in the
/// config layering: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    use secrecy::SecretString;

    dotenvy::dotenv().ok();

    // OpenAI overrides
    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        let openai = config
            .provider
            .openai
            .get_or_insert_with(|| super::types::provider::OpenAiConfig::with_api_key(""));
        openai.api_key = SecretString::from(api_key);
    }
    if let Ok(model) = std::env::var("MNEMO_MODEL") {
        config.agent.model = model.clone();
        if let Some(ref mut openai) = config.provider.openai {
            openai.default_model = model;
        }
    }
    if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
        if let Some(ref mut openai) = config.provider.openai {
            openai.base_url = url;
        }
    }

    // Storage overrides
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        let pg = config
            .storage
            .postgres
            .get_or_insert_with(|| super::types::storage::PostgresConfig {
                url: SecretString::from(String::new()),
                max_connections: 5,
                connect_timeout_secs: 30,
            });
        pg.url = SecretString::from(database_url);
    }
    if let Ok(url) = std::env::var("QDRANT_URL") {
        let qd = config
            .storage
            .qdrant
            .get_or_insert_with(super::types::storage::QdrantConfig::default);
        qd.url = url;
        config.storage.backend = super::types::storage::VectorBackendType::Qdrant;
    }
    if let Ok(v) = std::env::var("MNEMO_ALLOW_RESET") {
        if let Some(ref mut qd) = config.storage.qdrant {
            qd.allow_reset = v == "true" || v == "1";
        }
    }
    if let Ok(collection) = std::env::var("MNEMO_COLLECTION") {
        config.storage.collection = collection;
    }
    if let Ok(provider) = std::env::var("MNEMO_EMBEDDING_PROVIDER") {
        match provider.as_str() {
            "openai" => {
                config.storage.embedding.provider =
                    super::types::storage::EmbeddingProviderKind::OpenAi;
                config.storage.embedding.model = "text-embedding-3-small".to_string();
                config.storage.embedding.dimensions = 1536;
            }
            "local" => {
                config.storage.embedding.provider =
                    super::types::storage::EmbeddingProviderKind::Local;
            }
            other => {
                tracing::warn!("Unknown MNEMO_EMBEDDING_PROVIDER value: {}", other);
            }
        }
    }

    // Warehouse overrides (SQL generation PoC)
    if let Ok(url) = std::env::var("WAREHOUSE_URL") {
        let wh = config
            .warehouse
            .get_or_insert_with(|| super::types::WarehouseConfig {
                url: SecretString::from(String::new()),
                connect_timeout_secs: 30,
            });
        wh.url = SecretString::from(url);
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let config = Config::default();
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.model, config.agent.model);
        assert_eq!(loaded.storage.collection, config.storage.collection);
    }

    #[test]
    fn test_load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[agent]\nmodel = \"gpt-4o-mini\"\n\n[storage]\nbackend = \"qdrant\"\n",
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.model, "gpt-4o-mini");
        assert_eq!(
            loaded.storage.backend,
            crate::config::VectorBackendType::Qdrant
        );
    }

    #[test]
    fn test_json5_allows_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            "{\n  // chat model\n  agent: { model: \"gpt-4o\" },\n}\n",
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.model, "gpt-4o");
    }
}
