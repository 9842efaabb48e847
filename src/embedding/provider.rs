/// Embedding provider trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Implementations must be reentrant: the resolver calls them from several
/// blocking tasks at once.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts, one vector per input in order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// FastEmbed provider for local embedding generation
///
/// The default is a multilingual paraphrase model so that non-English
/// greetings compare sensibly.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    pub const SUPPORTED_MODELS: [&'static str; 5] = [
        "paraphrase-multilingual-MiniLM-L12-v2",
        "paraphrase-multilingual-mpnet-base-v2",
        "multilingual-e5-small",
        "all-MiniLM-L6-v2",
        "bge-small-en-v1.5",
    ];

    /// Create a new FastEmbed provider with the specified model
    ///
    /// Models are downloaded on first use into the fastembed cache directory.
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let (embedding_model, dimension) = model_spec(model_name).ok_or_else(|| {
            EmbeddingError::InitializationError(format!(
                "Unsupported model: {}. Supported: {}",
                model_name,
                Self::SUPPORTED_MODELS.join(", ")
            ))
        })?;

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded if not cached)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
        })
    }

    /// Create provider with the default multilingual model
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new(Self::SUPPORTED_MODELS[0])
    }

    pub fn is_supported(model_name: &str) -> bool {
        model_spec(model_name).is_some()
    }
}

fn model_spec(model_name: &str) -> Option<(EmbeddingModel, usize)> {
    match model_name {
        "paraphrase-multilingual-MiniLM-L12-v2" => {
            Some((EmbeddingModel::ParaphraseMLMiniLML12V2, 384))
        }
        "paraphrase-multilingual-mpnet-base-v2" => {
            Some((EmbeddingModel::ParaphraseMLMpnetBaseV2, 768))
        }
        "multilingual-e5-small" => Some((EmbeddingModel::MultilingualE5Small, 384)),
        "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        _ => None,
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let embedding = embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingError::GenerationError("No embeddings generated".to_string())
        })?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Dropping blanks would shift positions, so reject the whole batch
        if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput(format!(
                "Empty text at position {}",
                index
            )));
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_supported_models() {
        for name in FastEmbedProvider::SUPPORTED_MODELS {
            assert!(FastEmbedProvider::is_supported(name));
        }
        assert!(!FastEmbedProvider::is_supported("text-embedding-3-small"));
    }

    #[test]
    fn test_unsupported_model_rejected() {
        let result = FastEmbedProvider::new("text-embedding-3-small");
        assert!(matches!(
            result,
            Err(EmbeddingError::InitializationError(_))
        ));
    }

    #[test]
    #[ignore] // Requires model download (~220MB) - run with: cargo test -- --ignored
    fn test_provider_creation() {
        let provider = FastEmbedProvider::with_default_model().unwrap();
        assert_eq!(provider.dimension(), 384);
        assert_eq!(
            provider.model_name(),
            "paraphrase-multilingual-MiniLM-L12-v2"
        );
    }

    #[test]
    #[ignore] // Requires model download (~220MB) - run with: cargo test -- --ignored
    fn test_empty_text() {
        let provider = FastEmbedProvider::with_default_model().unwrap();
        assert!(provider.embed("").is_err());
        assert!(provider
            .embed_batch(&["hello".to_string(), " ".to_string()])
            .is_err());
    }

    #[test]
    #[ignore] // Requires model download (~220MB) - run with: cargo test -- --ignored
    fn test_semantic_similarity() {
        let provider = FastEmbedProvider::with_default_model().unwrap();

        let hello = provider.embed("hello").unwrap();
        let hi = provider.embed("hi there").unwrap();
        let physics = provider.embed("quantum entanglement explained").unwrap();

        let close = cosine_similarity(&hello, &hi).unwrap();
        let far = cosine_similarity(&hello, &physics).unwrap();
        assert!(close > far);
    }
}
