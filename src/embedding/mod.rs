/// Embedding generation and vector similarity
///
/// - EmbeddingProvider trait for abstraction over embedding backends
/// - FastEmbedProvider for local embedding (multilingual MiniLM, 384-dim)
/// - Normalization and stable best-match scoring over a linear list
/// - Per-phrase cache so corpus vectors need not be recomputed per request
mod cache;
mod provider;
mod similarity;

pub use cache::EmbeddingCache;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use similarity::{best_match, cosine_similarity, dot_product, normalize};
