//! Versioned embedding cache
//!
//! Cached vectors are valid only for the graph version they were computed
//! against. The cache is a scoped store object, replaced or merged
//! atomically on recompute completion - never written mid-computation, so
//! a cancelled or failed recompute leaves it untouched.

use super::EmbedError;
use crate::graph::NodeId;
use ndarray::Array1;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCache {
    version: u64,
    dim: usize,
    vectors: FxHashMap<NodeId, Array1<f32>>,
}

impl EmbeddingCache {
    pub fn empty(dim: usize) -> Self {
        EmbeddingCache {
            version: 0,
            dim,
            vectors: FxHashMap::default(),
        }
    }

    /// Graph version the cached vectors were computed against.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.vectors.contains_key(&id)
    }

    /// Fetch a vector, enforcing version freshness against the live graph.
    pub fn get(&self, id: NodeId, current_version: u64) -> Result<&Array1<f32>, EmbedError> {
        if self.version != current_version {
            return Err(EmbedError::Stale {
                node: id,
                cached_version: self.version,
                current_version,
            });
        }
        self.vectors.get(&id).ok_or(EmbedError::Missing(id))
    }

    /// Fetch without the freshness check (historical reads).
    pub fn get_unchecked(&self, id: NodeId) -> Option<&Array1<f32>> {
        self.vectors.get(&id)
    }

    /// Replace the whole cache with a freshly computed set.
    pub fn replace(&mut self, version: u64, vectors: FxHashMap<NodeId, Array1<f32>>) {
        self.version = version;
        self.vectors = vectors;
    }

    /// Merge an incremental recompute: updated entries overwrite, untouched
    /// entries are promoted to the new version (the recompute covered the
    /// entire dirty region, so what it did not touch is still valid).
    pub fn merge(&mut self, version: u64, updated: FxHashMap<NodeId, Array1<f32>>) {
        self.version = version;
        for (id, vec) in updated {
            self.vectors.insert(id, vec);
        }
    }

    /// Drop entries for the given nodes. Until the next recompute they
    /// surface as `Missing` rather than serving stale vectors.
    pub fn invalidate(&mut self, ids: impl IntoIterator<Item = NodeId>) -> usize {
        let mut dropped = 0;
        for id in ids {
            if self.vectors.remove(&id).is_some() {
                dropped += 1;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn vectors(ids: &[u64]) -> FxHashMap<NodeId, Array1<f32>> {
        ids.iter()
            .map(|i| (NodeId::new(*i), arr1(&[*i as f32, 1.0])))
            .collect()
    }

    #[test]
    fn test_stale_detection() {
        let mut cache = EmbeddingCache::empty(2);
        cache.replace(5, vectors(&[1, 2]));

        assert!(cache.get(NodeId::new(1), 5).is_ok());
        let err = cache.get(NodeId::new(1), 6).unwrap_err();
        assert!(matches!(err, EmbedError::Stale { cached_version: 5, current_version: 6, .. }));
    }

    #[test]
    fn test_missing_vs_stale() {
        let mut cache = EmbeddingCache::empty(2);
        cache.replace(3, vectors(&[1]));
        assert!(matches!(
            cache.get(NodeId::new(9), 3),
            Err(EmbedError::Missing(_))
        ));
    }

    #[test]
    fn test_merge_promotes_version() {
        let mut cache = EmbeddingCache::empty(2);
        cache.replace(3, vectors(&[1, 2]));
        cache.merge(4, vectors(&[2, 3]));

        assert_eq!(cache.version(), 4);
        assert_eq!(cache.len(), 3);
        // untouched entry readable at the new version
        assert!(cache.get(NodeId::new(1), 4).is_ok());
    }

    #[test]
    fn test_invalidate() {
        let mut cache = EmbeddingCache::empty(2);
        cache.replace(3, vectors(&[1, 2, 3]));
        let dropped = cache.invalidate([NodeId::new(2), NodeId::new(99)]);
        assert_eq!(dropped, 1);
        assert!(matches!(
            cache.get(NodeId::new(2), 3),
            Err(EmbedError::Missing(_))
        ));
        assert!(cache.get(NodeId::new(1), 3).is_ok());
    }
}
