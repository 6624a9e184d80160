//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_provider_config(config, result);
    result = validate_storage_config(config, result);

    result
}

fn validate_provider_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    if config.provider.openai.is_none() {
        result = result.with_warning(
            ValidationIssue::new(
                "provider.openai",
                "No LLM platform configured. The agent will not be able to generate responses.",
            )
            .with_suggestion(
                "Set OPENAI_API_KEY environment variable or configure provider.openai in config",
            ),
        );
    }

    result
}

fn validate_storage_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    use super::types::storage::{EmbeddingProviderKind, VectorBackendType};

    if config.storage.backend == VectorBackendType::Postgres && config.storage.postgres.is_none() {
        result = result.with_error(
            ValidationIssue::new(
                "storage.postgres",
                "PostgreSQL backend selected but not configured",
            )
            .with_suggestion("Set DATABASE_URL environment variable or configure storage.postgres"),
        );
    }

    if config.storage.backend == VectorBackendType::Qdrant && config.storage.qdrant.is_none() {
        result = result.with_error(
            ValidationIssue::new("storage.qdrant", "Qdrant backend selected but not configured")
                .with_suggestion("Set QDRANT_URL environment variable or configure storage.qdrant"),
        );
    }

    if config.storage.embedding.provider == EmbeddingProviderKind::OpenAi
        && config.provider.openai.is_none()
    {
        result = result.with_error(
            ValidationIssue::new(
                "storage.embedding.provider",
                "OpenAI embedding provider selected but no OpenAI API key configured",
            )
            .with_suggestion("Set OPENAI_API_KEY or switch storage.embedding.provider to local"),
        );
    }

    if config.storage.embedding.dimensions == 0 {
        result = result.with_error(ValidationIssue::new(
            "storage.embedding.dimensions",
            "Embedding dimensions must be non-zero",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        // Default config selects postgres without configuring it
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "storage.postgres"));
    }

    #[test]
    fn test_validate_openai_embedding_needs_key() {
        use crate::config::{EmbeddingProviderKind, PostgresConfig};
        use secrecy::SecretString;

        let mut config = Config::default();
        config.storage.postgres = Some(PostgresConfig {
            url: SecretString::from("postgres://localhost/mnemo"),
            max_connections: 5,
            connect_timeout_secs: 30,
        });
        config.storage.embedding.provider = EmbeddingProviderKind::OpenAi;

        let result = validate_config(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "storage.embedding.provider"));
    }
}
