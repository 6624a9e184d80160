//! Configuration module - Modular configuration management
//!
//! Split into focused modules:
//! - types/mod.rs: Core configuration types (Config, AgentConfig, etc.)
//! - types/provider.rs: LLM platform configuration
//! - types/storage.rs: Vector store and embedding configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::{AgentConfig, Config, WarehouseConfig};

// Re-export provider types
pub use types::provider::{OpenAiConfig, Platform, ProviderConfig};

// Re-export storage types
pub use types::storage::{
    EmbeddingConfig, EmbeddingProviderKind, PostgresConfig, QdrantConfig, StorageConfig,
    VectorBackendType,
};

// Re-export IO and utilities
pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path, history_path, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
