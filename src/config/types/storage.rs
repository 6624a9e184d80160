//! Storage configuration types
//!
//! Configuration for the vector store backends and embedding providers.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected vector store backend
    #[serde(default)]
    pub backend: VectorBackendType,
    /// Default collection/table name
    #[serde(default = "default_collection")]
    pub collection: String,
    /// PostgreSQL configuration
    pub postgres: Option<PostgresConfig>,
    /// Qdrant configuration
    pub qdrant: Option<QdrantConfig>,
    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: VectorBackendType::Postgres,
            collection: default_collection(),
            postgres: None,
            qdrant: None,
            embedding: EmbeddingConfig::default(),
        }
    }
}

fn default_collection() -> String {
    "memory".to_string()
}

/// Vector store backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendType {
    /// PostgreSQL with pgvector (default)
    #[default]
    Postgres,
    /// Qdrant
    Qdrant,
}

impl std::fmt::Display for VectorBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorBackendType::Postgres => write!(f, "postgres"),
            VectorBackendType::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL
    #[serde(skip_serializing, default = "default_secret")]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    /// Prefix for collection names
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
    /// Opt-in flag required before `reset()` will wipe data
    #[serde(default)]
    pub allow_reset: bool,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        QdrantConfig {
            url: default_qdrant_url(),
            collection_prefix: default_collection_prefix(),
            allow_reset: false,
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection_prefix() -> String {
    "mnemo".to_string()
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions
    #[serde(default = "default_embedding_dims")]
    pub dimensions: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
        }
    }
}

/// Embedding provider kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// In-process fastembed model (default)
    #[default]
    Local,
    /// Hosted OpenAI embeddings API
    OpenAi,
}

fn default_embedding_model() -> String {
    "multilingual-e5-small".to_string()
}

fn default_embedding_dims() -> u32 {
    384
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, VectorBackendType::Postgres);
        assert_eq!(config.collection, "memory");
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn test_qdrant_reset_opt_in_defaults_off() {
        let config = QdrantConfig::default();
        assert!(!config.allow_reset);
    }
}
