use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::embedding::FastEmbedProvider;
use crate::error::{ReplybotError, Result, ValidationError};
use std::net::SocketAddr;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_server(config, &mut errors);
        Self::validate_line(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_resolver(config, &mut errors);
        Self::validate_generation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReplybotError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_server(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.server.bind_addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "server.bind_addr",
                format!("Invalid socket address: {}", config.server.bind_addr),
            ));
        }

        if !config.server.webhook_path.starts_with('/') {
            errors.push(ValidationError::new(
                "server.webhook_path",
                "Webhook path must start with '/'",
            ));
        }

        if config.server.webhook_path == "/health" {
            errors.push(ValidationError::new(
                "server.webhook_path",
                "Webhook path collides with the health endpoint",
            ));
        }
    }

    fn validate_line(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.line.channel_secret_env.is_empty() {
            errors.push(ValidationError::new(
                "line.channel_secret_env",
                "Channel secret variable name cannot be empty",
            ));
        }

        if config.line.access_token_env.is_empty() {
            errors.push(ValidationError::new(
                "line.access_token_env",
                "Access token variable name cannot be empty",
            ));
        }

        if config.line.api_base.is_empty() {
            errors.push(ValidationError::new(
                "line.api_base",
                "API base URL cannot be empty",
            ));
        }

        Self::validate_timeout("line.timeout", &config.line.timeout, errors);
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        match config.corpus.source.as_str() {
            "file" => {
                if config.corpus.file.as_os_str().is_empty() {
                    errors.push(ValidationError::new(
                        "corpus.file",
                        "Corpus file path cannot be empty when source is 'file'",
                    ));
                }
            }
            "neo4j" => {
                if config.corpus.neo4j.url.is_empty() {
                    errors.push(ValidationError::new(
                        "corpus.neo4j.url",
                        "Neo4j URL cannot be empty when source is 'neo4j'",
                    ));
                }
                if config.corpus.neo4j.database.is_empty() {
                    errors.push(ValidationError::new(
                        "corpus.neo4j.database",
                        "Neo4j database name cannot be empty",
                    ));
                }
                Self::validate_timeout(
                    "corpus.neo4j.timeout",
                    &config.corpus.neo4j.timeout,
                    errors,
                );
            }
            other => {
                errors.push(ValidationError::new(
                    "corpus.source",
                    format!("Source must be 'neo4j' or 'file', got '{}'", other),
                ));
            }
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let model = &config.embedding.model;
        if model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        } else if !FastEmbedProvider::is_supported(model) {
            errors.push(ValidationError::new(
                "embedding.model",
                format!(
                    "Unsupported model '{}'. Supported: {}",
                    model,
                    FastEmbedProvider::SUPPORTED_MODELS.join(", ")
                ),
            ));
        }

        Self::validate_timeout("embedding.timeout", &config.embedding.timeout, errors);
    }

    fn validate_resolver(config: &Config, errors: &mut Vec<ValidationError>) {
        let threshold = config.resolver.threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "resolver.threshold",
                format!("Threshold must be between -1.0 and 1.0, got {}", threshold),
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.generation.endpoint.is_empty() {
            errors.push(ValidationError::new(
                "generation.endpoint",
                "Endpoint cannot be empty",
            ));
        }

        if config.generation.model.is_empty() {
            errors.push(ValidationError::new(
                "generation.model",
                "Model name cannot be empty",
            ));
        }

        if config.generation.max_tokens == 0 {
            errors.push(ValidationError::new(
                "generation.max_tokens",
                "Max tokens must be greater than 0",
            ));
        }

        Self::validate_timeout("generation.timeout", &config.generation.timeout, errors);
    }

    fn validate_timeout(path: &str, value: &str, errors: &mut Vec<ValidationError>) {
        match parse_duration(value) {
            Some(duration) if duration.is_zero() => {
                errors.push(ValidationError::new(path, "Timeout must be greater than 0"));
            }
            Some(_) => {}
            None => {
                errors.push(ValidationError::new(
                    path,
                    format!("Invalid duration format: {}", value),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(ReplybotError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = Config::default();
        config.resolver.threshold = 1.5;
        assert_eq!(error_paths(&config), vec!["resolver.threshold"]);
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.generation.timeout = "0s".to_string();
        assert_eq!(error_paths(&config), vec!["generation.timeout"]);
    }

    #[test]
    fn test_invalid_source() {
        let mut config = Config::default();
        config.corpus.source = "sqlite".to_string();
        assert_eq!(error_paths(&config), vec!["corpus.source"]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.embedding.model = String::new();
        config.generation.max_tokens = 0;
        config.server.bind_addr = "not an address".to_string();

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"embedding.model".to_string()));
        assert!(paths.contains(&"generation.max_tokens".to_string()));
        assert!(paths.contains(&"server.bind_addr".to_string()));
    }

    #[test]
    fn test_webhook_path_collides_with_health() {
        let mut config = Config::default();
        config.server.webhook_path = "/health".to_string();
        assert_eq!(error_paths(&config), vec!["server.webhook_path"]);
    }

    #[test]
    fn test_unsupported_model() {
        let mut config = Config::default();
        config.embedding.model = "gpt-embed-9000".to_string();
        assert_eq!(error_paths(&config), vec!["embedding.model"]);
    }
}
