//! Configuration management for replybot
//!
//! Configuration lives in a TOML file, may carry named profiles, and can be
//! overridden through `REPLYBOT_SECTION__KEY` environment variables. Secrets
//! are never stored in the file; the file only names the variables that
//! hold them.

use crate::error::{ReplybotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Schema version written by `config init` and accepted by the validator
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub server: ServerConfig,
    pub line: LineConfig,
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub resolver: ResolverConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub webhook_path: String,
}

/// Messaging platform (LINE) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Environment variable holding the channel secret used for signatures
    pub channel_secret_env: String,
    /// Environment variable holding the channel access token used for replies
    pub access_token_env: String,
    pub api_base: String,
    pub timeout: String,
}

/// Where the phrase corpus comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub source: String, // "neo4j" or "file"
    pub file: PathBuf,
    pub neo4j: Neo4jConfig,
}

/// Neo4j HTTP endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password_env: String,
    pub timeout: String,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub timeout: String,
}

/// Similarity resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// A best score strictly above this value is a confident match
    pub threshold: f32,
    pub cache_embeddings: bool,
    /// Answer through the generation fallback when embedding fails
    pub fallback_on_error: bool,
}

/// Generation fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub instruction: String,
    pub question_label: String,
    pub answer_label: String,
    pub provenance_marker: String,
    pub timeout: String,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReplybotError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ReplybotError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ReplybotError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| ReplybotError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(source) = overrides.corpus_source {
            self.corpus.source = source;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(threshold) = overrides.threshold {
            self.resolver.threshold = threshold;
        }
        if let Some(model) = overrides.generation_model {
            self.generation.model = model;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: REPLYBOT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("REPLYBOT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SERVER__BIND_ADDR" => self.server.bind_addr = value.to_string(),
            "LINE__API_BASE" => self.line.api_base = value.to_string(),
            "CORPUS__SOURCE" => self.corpus.source = value.to_string(),
            "CORPUS__FILE" => self.corpus.file = PathBuf::from(value),
            "CORPUS__NEO4J__URL" => self.corpus.neo4j.url = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "RESOLVER__THRESHOLD" => {
                self.resolver.threshold =
                    value.parse().map_err(|_| ReplybotError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as a number", value),
                    })?;
            }
            "RESOLVER__CACHE_EMBEDDINGS" => {
                self.resolver.cache_embeddings =
                    value.parse().map_err(|_| ReplybotError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as boolean", value),
                    })?;
            }
            "GENERATION__ENDPOINT" => self.generation.endpoint = value.to_string(),
            "GENERATION__MODEL" => self.generation.model = value.to_string(),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ReplybotError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("replybot").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            server: ServerConfig {
                bind_addr: "127.0.0.1:5000".to_string(),
                webhook_path: "/".to_string(),
            },
            line: LineConfig {
                channel_secret_env: "LINE_CHANNEL_SECRET".to_string(),
                access_token_env: "LINE_CHANNEL_ACCESS_TOKEN".to_string(),
                api_base: "https://api.line.me".to_string(),
                timeout: "10s".to_string(),
            },
            corpus: CorpusConfig {
                source: "neo4j".to_string(),
                file: PathBuf::from("~/.config/replybot/corpus.toml"),
                neo4j: Neo4jConfig {
                    url: "http://localhost:7474".to_string(),
                    database: "neo4j".to_string(),
                    user: "neo4j".to_string(),
                    password_env: "NEO4J_PASSWORD".to_string(),
                    timeout: "10s".to_string(),
                },
            },
            embedding: EmbeddingConfig {
                model: "paraphrase-multilingual-MiniLM-L12-v2".to_string(),
                timeout: "10s".to_string(),
            },
            resolver: ResolverConfig {
                threshold: 0.6,
                cache_embeddings: true,
                fallback_on_error: true,
            },
            generation: GenerationConfig {
                endpoint: "http://localhost:11434/api/generate".to_string(),
                model: "supachai/llama-3-typhoon-v1.5".to_string(),
                max_tokens: 60,
                instruction: "Answer in no more than 20 words, in the language of the question."
                    .to_string(),
                question_label: "Question".to_string(),
                answer_label: "Answer".to_string(),
                provenance_marker: "\n(answered by fallback model)".to_string(),
                timeout: "60s".to_string(),
            },
            profiles: HashMap::new(),
        }
    }
}

/// Parse a duration string such as "10s", "500ms" or "2m"; bare numbers are seconds
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();

    // Check "ms" before "s" because "ms" ends with "s"
    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        value.parse().ok().map(Duration::from_secs)
    }
}

/// Parse a duration field, naming the offending key on failure
pub fn duration_field(path: &str, value: &str) -> Result<Duration> {
    parse_duration(value).ok_or_else(|| ReplybotError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Invalid duration format: {}", value),
    })
}

/// Read a secret from the environment variable named in the configuration
pub fn read_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ReplybotError::MissingSecret {
            name: env_name.to_string(),
        }),
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
