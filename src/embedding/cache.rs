/// Per-phrase embedding cache, keyed by phrase text
use ahash::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Normalized corpus vectors reused across requests
///
/// One cache belongs to one embedding model; it must be cleared whenever the
/// corpus snapshot is replaced.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Arc<[f32]>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached vector
    pub fn get(&self, text: &str) -> Option<Arc<[f32]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(text).cloned()
    }

    /// Look up every text, returning hits in order and the positions that missed
    pub fn lookup(&self, texts: &[String]) -> (Vec<Option<Arc<[f32]>>>, Vec<usize>) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut misses = Vec::new();
        let found = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let hit = entries.get(text).cloned();
                if hit.is_none() {
                    misses.push(index);
                }
                hit
            })
            .collect();
        (found, misses)
    }

    pub fn insert(&self, text: String, vector: Arc<[f32]>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(text, vector);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        tracing::debug!("Cleared {} cached embeddings", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let cache = EmbeddingCache::new();
        cache.insert("hello".to_string(), Arc::from(vec![1.0, 0.0]));

        let (found, misses) = cache.lookup(&["hello".to_string(), "bye".to_string()]);
        assert_eq!(found[0].as_deref(), Some(&[1.0, 0.0][..]));
        assert!(found[1].is_none());
        assert_eq!(misses, vec![1]);
    }

    #[test]
    fn test_clear() {
        let cache = EmbeddingCache::new();
        cache.insert("a".to_string(), Arc::from(vec![1.0]));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
