//! Similarity resolver: decides whether an utterance has a stored reply
//!
//! The resolver embeds every corpus phrase and the utterance, takes the
//! single best cosine score and compares it against a threshold. A score
//! strictly above the threshold answers from the corpus; anything else is
//! handed back as a fallback for the generation model. Embedding failures
//! are errors, never a silent fallback.

use crate::corpus::{Category, Corpus};
use crate::embedding::{best_match, normalize, EmbeddingCache, EmbeddingError, EmbeddingProvider};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Utterance is empty")]
    EmptyUtterance,

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding task failed: {0}")]
    Task(String),
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Corpus,
    Fallback,
}

/// Outcome of resolving one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ResolvedReply {
    /// Confident match against a stored phrase
    Corpus {
        reply: String,
        matched: String,
        category: Category,
        score: f32,
    },
    /// No stored phrase is close enough; `best_score` is `None` for an empty corpus
    Fallback {
        utterance: String,
        best_score: Option<f32>,
    },
}

impl ResolvedReply {
    pub fn source(&self) -> ReplySource {
        match self {
            ResolvedReply::Corpus { .. } => ReplySource::Corpus,
            ResolvedReply::Fallback { .. } => ReplySource::Fallback,
        }
    }
}

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub threshold: f32,
    pub cache_embeddings: bool,
    pub timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            cache_embeddings: true,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A score is confident only when it is strictly greater than the threshold
pub fn is_confident(score: f32, threshold: f32) -> bool {
    score > threshold
}

/// A corpus together with the vectors computed for it
///
/// The cache lives and dies with its corpus, so a request still scoring an
/// old snapshot can only fill that snapshot's cache.
struct Snapshot {
    corpus: Arc<Corpus>,
    cache: Arc<EmbeddingCache>,
}

impl Snapshot {
    fn new(corpus: Corpus) -> Arc<Self> {
        Arc::new(Self {
            corpus: Arc::new(corpus),
            cache: Arc::new(EmbeddingCache::new()),
        })
    }
}

/// Matches utterances against an immutable corpus snapshot
pub struct SimilarityResolver {
    provider: Arc<dyn EmbeddingProvider>,
    snapshot: RwLock<Arc<Snapshot>>,
    settings: ResolverSettings,
}

impl SimilarityResolver {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        corpus: Corpus,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            provider,
            snapshot: RwLock::new(Snapshot::new(corpus)),
            settings,
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current corpus snapshot
    pub fn corpus(&self) -> Arc<Corpus> {
        self.snapshot().corpus.clone()
    }

    /// Swap in a new snapshot with an empty embedding cache
    ///
    /// Requests already in flight finish against the snapshot and cache they
    /// started with.
    pub fn replace_corpus(&self, corpus: Corpus) {
        let fresh = Snapshot::new(corpus);
        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *current = fresh;
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Vectors cached for the current snapshot
    pub fn cached_embeddings(&self) -> usize {
        self.snapshot().cache.len()
    }

    /// Resolve an utterance to a stored reply or a fallback signal
    pub async fn resolve(&self, utterance: &str) -> Result<ResolvedReply, ResolutionError> {
        if utterance.trim().is_empty() {
            return Err(ResolutionError::EmptyUtterance);
        }

        let snapshot = self.snapshot();
        let corpus = snapshot.corpus.clone();
        if corpus.is_empty() {
            tracing::debug!("Corpus is empty, deferring to fallback");
            return Ok(ResolvedReply::Fallback {
                utterance: utterance.to_string(),
                best_score: None,
            });
        }

        let provider = self.provider.clone();
        let cache = self
            .settings
            .cache_embeddings
            .then(|| snapshot.cache.clone());
        let scoring_corpus = corpus.clone();
        let query = utterance.to_string();

        let task = tokio::task::spawn_blocking(move || {
            score_utterance(provider.as_ref(), cache.as_deref(), &scoring_corpus, &query)
        });

        let best = tokio::time::timeout(self.settings.timeout, task)
            .await
            .map_err(|_| ResolutionError::Timeout(self.settings.timeout))?
            .map_err(|e| ResolutionError::Task(e.to_string()))??;

        let Some((index, score)) = best else {
            return Ok(ResolvedReply::Fallback {
                utterance: utterance.to_string(),
                best_score: None,
            });
        };

        // Index comes from scoring this same snapshot
        let entry = match corpus.get(index) {
            Some(entry) => entry,
            None => {
                return Err(ResolutionError::Task(format!(
                    "Best match index {} outside corpus of {}",
                    index,
                    corpus.len()
                )))
            }
        };

        if is_confident(score, self.settings.threshold) {
            tracing::debug!(
                score,
                category = %entry.category,
                matched = %entry.text,
                "Confident corpus match"
            );
            Ok(ResolvedReply::Corpus {
                reply: entry.reply.clone(),
                matched: entry.text.clone(),
                category: entry.category,
                score,
            })
        } else {
            tracing::debug!(
                score,
                threshold = self.settings.threshold,
                "No confident match"
            );
            Ok(ResolvedReply::Fallback {
                utterance: utterance.to_string(),
                best_score: Some(score),
            })
        }
    }
}

/// Embed corpus and query, then return the stable best match
fn score_utterance(
    provider: &dyn EmbeddingProvider,
    cache: Option<&EmbeddingCache>,
    corpus: &Corpus,
    utterance: &str,
) -> Result<Option<(usize, f32)>, ResolutionError> {
    let corpus_vectors = corpus_vectors(provider, cache, corpus)?;

    let mut query = provider.embed(utterance)?;
    normalize(&mut query);

    Ok(best_match(&query, &corpus_vectors)?)
}

fn corpus_vectors(
    provider: &dyn EmbeddingProvider,
    cache: Option<&EmbeddingCache>,
    corpus: &Corpus,
) -> Result<Vec<Arc<[f32]>>, EmbeddingError> {
    let texts = corpus.texts();

    let Some(cache) = cache else {
        return Ok(embed_normalized(provider, &texts)?
            .into_iter()
            .map(Arc::from)
            .collect());
    };

    let (mut found, misses) = cache.lookup(&texts);
    if !misses.is_empty() {
        let missing: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
        tracing::debug!("Embedding {} uncached corpus phrases", missing.len());

        let vectors = embed_normalized(provider, &missing)?;
        for (position, vector) in misses.into_iter().zip(vectors) {
            let vector: Arc<[f32]> = Arc::from(vector);
            cache.insert(texts[position].clone(), vector.clone());
            found[position] = Some(vector);
        }
    }

    found
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| EmbeddingError::GenerationError("Missing corpus vector".to_string()))
        })
        .collect()
}

fn embed_normalized(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut vectors = provider.embed_batch(texts)?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::GenerationError(format!(
            "Expected {} embeddings, got {}",
            texts.len(),
            vectors.len()
        )));
    }
    for vector in vectors.iter_mut() {
        normalize(vector);
    }
    Ok(vectors)
}
