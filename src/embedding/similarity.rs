//! Vector math for matching utterances against the corpus.

use super::EmbeddingError;

/// Normalize an embedding to unit length in place. Zero vectors are left as is.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Dot product; equals cosine similarity when both inputs are unit length.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Cosine similarity of two arbitrary vectors, in [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    let dot = dot_product(a, b)?;
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (magnitude_a * magnitude_b))
}

/// Highest-scoring candidate as `(index, score)`.
///
/// Candidates and query must already be normalized. Ties keep the earliest
/// index. Returns `None` when there are no candidates.
pub fn best_match<V: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[V],
) -> Result<Option<(usize, f32)>, EmbeddingError> {
    let mut best: Option<(usize, f32)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let score = dot_product(query, candidate.as_ref())?;
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }

    Ok(best)
}
