//! Turns an utterance into reply text: stored answer first, generation otherwise.

use crate::generation::{GenerationError, Generator, PromptTemplate};
use crate::resolver::{ReplySource, ResolutionError, ResolvedReply, SimilarityResolver};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RespondError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Final reply text and where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// Best similarity score, when one was computed
    pub score: Option<f32>,
}

pub struct Responder {
    resolver: Arc<SimilarityResolver>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    fallback_on_error: bool,
}

impl Responder {
    pub fn new(
        resolver: Arc<SimilarityResolver>,
        generator: Arc<dyn Generator>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            resolver,
            generator,
            template,
            fallback_on_error: false,
        }
    }

    /// Use the generation model when embedding fails instead of giving up
    pub fn with_fallback_on_error(mut self, enabled: bool) -> Self {
        self.fallback_on_error = enabled;
        self
    }

    pub fn resolver(&self) -> &Arc<SimilarityResolver> {
        &self.resolver
    }

    pub async fn respond(&self, utterance: &str) -> Result<Reply, RespondError> {
        let resolved = match self.resolver.resolve(utterance).await {
            Ok(resolved) => resolved,
            Err(ResolutionError::EmptyUtterance) => {
                return Err(ResolutionError::EmptyUtterance.into())
            }
            Err(e) if self.fallback_on_error => {
                tracing::error!("Resolution failed, answering with fallback model: {}", e);
                ResolvedReply::Fallback {
                    utterance: utterance.to_string(),
                    best_score: None,
                }
            }
            Err(e) => return Err(e.into()),
        };

        match resolved {
            ResolvedReply::Corpus { reply, score, .. } => Ok(Reply {
                text: reply,
                source: ReplySource::Corpus,
                score: Some(score),
            }),
            ResolvedReply::Fallback {
                utterance,
                best_score,
            } => {
                let prompt = self.template.prompt(&utterance);
                tracing::info!(
                    model = self.generator.model(),
                    best_score = ?best_score,
                    "No stored reply, generating"
                );
                let generated = self.generator.generate(&prompt).await?;
                Ok(Reply {
                    text: self.template.mark(&generated),
                    source: ReplySource::Fallback,
                    score: best_score,
                })
            }
        }
    }
}
