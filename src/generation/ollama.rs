/// Ollama-compatible `/api/generate` client
use super::{GenerationError, Generator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    instruction: String,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            max_tokens,
            instruction: String::new(),
        })
    }

    /// Instruction appended to every prompt, e.g. a length or language limit
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    fn full_prompt(&self, prompt: &str) -> String {
        if self.instruction.is_empty() {
            prompt.to_string()
        } else {
            format!("{} {}", prompt, self.instruction)
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: self.full_prompt(prompt),
            stream: false,
            max_tokens: self.max_tokens,
        };

        tracing::debug!("Requesting generation from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Generation failed with status {}: {}", status, body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Http(e)
            }
        })?;

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .response
            .ok_or_else(|| GenerationError::InvalidResponse("Missing 'response' field".to_string()))
    }
}
