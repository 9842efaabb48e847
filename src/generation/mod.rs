//! Generation fallback: asks a text-generation service when the corpus has no answer

mod ollama;

pub use ollama::OllamaGenerator;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation request timed out")]
    Timeout,

    #[error("Generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Remote text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier used in logs
    fn model(&self) -> &str;

    /// Generate a short answer for the prompt
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Shapes the fallback prompt and marks generated answers
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub question_label: String,
    pub answer_label: String,
    pub provenance_marker: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            question_label: "Question".to_string(),
            answer_label: "Answer".to_string(),
            provenance_marker: "\n(answered by fallback model)".to_string(),
        }
    }
}

impl PromptTemplate {
    /// `"{question_label}: {utterance}\n{answer_label}:"`
    pub fn prompt(&self, utterance: &str) -> String {
        format!(
            "{}: {}\n{}:",
            self.question_label, utterance, self.answer_label
        )
    }

    /// Append the provenance marker to a generated answer
    pub fn mark(&self, generated: &str) -> String {
        format!("{}{}", generated, self.provenance_marker)
    }
}
