//! Phrase corpus: the greeting and question phrases the bot can answer directly
//!
//! A [`Corpus`] is an immutable, ordered snapshot. Greeting entries come
//! first, then question entries, each in load order. Entries carry their own
//! [`Category`], so a similarity position maps straight back to its entry.

mod file_store;
mod neo4j;

pub use file_store::{CorpusFile, FileCorpusStore, GreetingRow, QuestionRow};
pub use neo4j::Neo4jStore;

use crate::config::{duration_field, expand_tilde, read_secret, CorpusConfig};
use ahash::{HashMap, HashMapExt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid corpus file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Corpus store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Corpus store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },

    #[error("Invalid corpus store response: {0}")]
    InvalidResponse(String),
}

/// Which table a phrase was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Greeting,
    Question,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Greeting => write!(f, "greeting"),
            Category::Question => write!(f, "question"),
        }
    }
}

/// A known phrase together with its canned reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub text: String,
    pub category: Category,
    pub reply: String,
}

/// Ordered, deduplicated phrase snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Corpus {
    entries: Vec<PhraseEntry>,
}

impl Corpus {
    /// Build a corpus from raw `(phrase, reply)` pairs of both categories
    ///
    /// Phrases are deduplicated within each category: the first occurrence
    /// fixes the position, the last occurrence supplies the reply. Blank
    /// phrases are dropped since they cannot be embedded.
    pub fn new(greetings: Vec<(String, String)>, questions: Vec<(String, String)>) -> Self {
        let mut entries = dedup(greetings, Category::Greeting);
        entries.extend(dedup(questions, Category::Question));
        Self { entries }
    }

    pub fn entries(&self) -> &[PhraseEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PhraseEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries in one category
    pub fn count(&self, category: Category) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .count()
    }

    /// Phrase texts in corpus order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }
}

fn dedup(pairs: Vec<(String, String)>, category: Category) -> Vec<PhraseEntry> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(pairs.len());
    let mut entries: Vec<PhraseEntry> = Vec::with_capacity(pairs.len());

    for (text, reply) in pairs {
        if text.trim().is_empty() {
            tracing::warn!("Skipping blank {} phrase", category);
            continue;
        }

        match positions.get(&text) {
            Some(&index) => entries[index].reply = reply,
            None => {
                positions.insert(text.clone(), entries.len());
                entries.push(PhraseEntry {
                    text,
                    category,
                    reply,
                });
            }
        }
    }

    entries
}

/// Source of the two phrase tables
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Load `(phrase, reply)` pairs for greetings
    async fn load_greetings(&self) -> Result<Vec<(String, String)>, CorpusError>;

    /// Load `(question, answer)` pairs for questions
    async fn load_questions(&self) -> Result<Vec<(String, String)>, CorpusError>;
}

/// Load both tables from a store and build a snapshot
pub async fn load_corpus(store: &dyn CorpusStore) -> Result<Corpus, CorpusError> {
    let greetings = store.load_greetings().await?;
    let questions = store.load_questions().await?;

    let corpus = Corpus::new(greetings, questions);

    tracing::info!(
        store = store.name(),
        greetings = corpus.count(Category::Greeting),
        questions = corpus.count(Category::Question),
        "Corpus loaded"
    );

    Ok(corpus)
}

/// Build the configured corpus store
pub fn store_from_config(config: &CorpusConfig) -> crate::error::Result<Box<dyn CorpusStore>> {
    match config.source.as_str() {
        "file" => Ok(Box::new(FileCorpusStore::new(expand_tilde(&config.file)))),
        "neo4j" => {
            let password = read_secret(&config.neo4j.password_env)?;
            let timeout = duration_field("corpus.neo4j.timeout", &config.neo4j.timeout)?;
            let store = Neo4jStore::new(
                &config.neo4j.url,
                &config.neo4j.database,
                &config.neo4j.user,
                password,
                timeout,
            )
            .map_err(|e| crate::error::ReplybotError::Corpus(CorpusError::Http(e)))?;
            Ok(Box::new(store))
        }
        other => Err(crate::error::ReplybotError::InvalidConfigValue {
            path: "corpus.source".to_string(),
            message: format!("Unknown corpus source '{}'", other),
        }),
    }
}
