/// TOML-backed corpus store for offline runs and fixtures
use super::{CorpusError, CorpusStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub greeting: Vec<GreetingRow>,
    #[serde(default)]
    pub question: Vec<QuestionRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingRow {
    pub phrase: String,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    pub question: String,
    pub answer: String,
}

/// Reads `[[greeting]]` and `[[question]]` tables from a TOML file
///
/// The file is re-read on every load so a refresh picks up edits.
pub struct FileCorpusStore {
    path: PathBuf,
}

impl FileCorpusStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<CorpusFile, CorpusError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CorpusError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(toml::from_str(&content)?)
    }
}

#[async_trait]
impl CorpusStore for FileCorpusStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_greetings(&self) -> Result<Vec<(String, String)>, CorpusError> {
        let file = self.read().await?;
        Ok(file
            .greeting
            .into_iter()
            .map(|row| (row.phrase, row.reply))
            .collect())
    }

    async fn load_questions(&self) -> Result<Vec<(String, String)>, CorpusError> {
        let file = self.read().await?;
        Ok(file
            .question
            .into_iter()
            .map(|row| (row.question, row.answer))
            .collect())
    }
}
