use std::path::PathBuf;
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::embedding::EmbeddingError;
use crate::gateway::DeliveryError;
use crate::generation::GenerationError;
use crate::resolver::ResolutionError;
use crate::responder::RespondError;

/// Main error type for the replybot application
#[derive(Error, Debug)]
pub enum ReplybotError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Required secret is missing from the environment
    #[error("Environment variable {name} is not set")]
    MissingSecret { name: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Corpus store errors
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Resolution errors
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Generation fallback errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Reply delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RespondError> for ReplybotError {
    fn from(e: RespondError) -> Self {
        match e {
            RespondError::Resolution(e) => ReplybotError::Resolution(e),
            RespondError::Generation(e) => ReplybotError::Generation(e),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for replybot operations
pub type Result<T> = std::result::Result<T, ReplybotError>;
