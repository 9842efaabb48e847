//! Wiring from configuration to a ready responder

use crate::config::{duration_field, Config};
use crate::corpus::{load_corpus, store_from_config, Corpus, CorpusStore};
use crate::embedding::{EmbeddingProvider, FastEmbedProvider};
use crate::error::{ReplybotError, Result};
use crate::generation::{OllamaGenerator, PromptTemplate};
use crate::resolver::{ResolverSettings, SimilarityResolver};
use crate::responder::Responder;
use std::sync::Arc;

/// Long-lived components shared by the server and the one-shot commands
pub struct App {
    store: Box<dyn CorpusStore>,
    resolver: Arc<SimilarityResolver>,
    responder: Arc<Responder>,
}

impl App {
    /// Load the embedding model and corpus, then assemble the responder
    pub async fn build(config: &Config) -> Result<Self> {
        let store = store_from_config(&config.corpus)?;

        let model = config.embedding.model.clone();
        tracing::info!(model = %model, "Loading embedding model");
        let provider = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&model))
            .await
            .map_err(|e| {
                ReplybotError::Other(anyhow::anyhow!("Model loading task failed: {}", e))
            })??;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);

        let corpus = load_corpus(store.as_ref()).await?;

        Self::from_parts(config, store, provider, corpus)
    }

    /// Assemble from an already loaded provider and corpus
    pub fn from_parts(
        config: &Config,
        store: Box<dyn CorpusStore>,
        provider: Arc<dyn EmbeddingProvider>,
        corpus: Corpus,
    ) -> Result<Self> {
        let settings = ResolverSettings {
            threshold: config.resolver.threshold,
            cache_embeddings: config.resolver.cache_embeddings,
            timeout: duration_field("embedding.timeout", &config.embedding.timeout)?,
        };
        let resolver = Arc::new(SimilarityResolver::new(provider, corpus, settings));

        let generation = &config.generation;
        let generator = OllamaGenerator::new(
            &generation.endpoint,
            &generation.model,
            generation.max_tokens,
            duration_field("generation.timeout", &generation.timeout)?,
        )?
        .with_instruction(&generation.instruction);

        let template = PromptTemplate {
            question_label: generation.question_label.clone(),
            answer_label: generation.answer_label.clone(),
            provenance_marker: generation.provenance_marker.clone(),
        };

        let responder = Responder::new(resolver.clone(), Arc::new(generator), template)
            .with_fallback_on_error(config.resolver.fallback_on_error);

        Ok(Self {
            store,
            resolver,
            responder: Arc::new(responder),
        })
    }

    pub fn resolver(&self) -> &Arc<SimilarityResolver> {
        &self.resolver
    }

    pub fn responder(&self) -> &Arc<Responder> {
        &self.responder
    }

    /// Reload the corpus from its store
    ///
    /// On failure the current snapshot stays in place.
    pub async fn refresh_corpus(&self) -> Result<usize> {
        let corpus = load_corpus(self.store.as_ref()).await?;
        let entries = corpus.len();
        self.resolver.replace_corpus(corpus);
        tracing::info!(entries, "Corpus refreshed");
        Ok(entries)
    }
}
