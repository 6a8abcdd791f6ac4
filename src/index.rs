//! Exact in-memory similarity index over embedded corpus chunks

use crate::embed::{cosine_similarity, dot_product};
use crate::{Chunk, Error, Result};
use serde::{Deserialize, Serialize};

/// Distance metric for vector search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity
    #[default]
    Cosine,
    /// Dot product
    DotProduct,
}

impl DistanceMetric {
    /// Score two vectors of equal length; higher is more similar
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::DotProduct => dot_product(a, b),
        }
    }
}

/// A chunk returned by [`VectorStore::search`]
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score under the store's metric
    pub score: f32,
}

/// Vector store for dense retrieval
///
/// Built once from chunks and their vectors; never mutated afterwards.
/// Entries keep insertion order, which also breaks score ties.
#[derive(Debug, Clone)]
pub struct VectorStore {
    metric: DistanceMetric,
    dimension: usize,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl VectorStore {
    /// Build a store from chunks and their vectors, paired by position
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        Self::build_with_metric(chunks, vectors, DistanceMetric::default())
    }

    /// Build a store using a specific metric
    pub fn build_with_metric(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidConfig(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if vectors.first().is_some() && dimension == 0 {
            return Err(Error::InvalidConfig("empty embedding vector".to_string()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        tracing::debug!(entries = chunks.len(), dimension, ?metric, "built vector store");
        Ok(Self {
            metric,
            dimension,
            entries: chunks.into_iter().zip(vectors).collect(),
        })
    }

    /// Build a store from chunks whose embeddings are already set
    ///
    /// Each vector is moved out of its chunk, so stored chunks (and the
    /// hits cloned from them) carry no embedding of their own.
    pub fn from_embedded_chunks(mut chunks: Vec<Chunk>, metric: DistanceMetric) -> Result<Self> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &mut chunks {
            let embedding = chunk
                .embedding
                .take()
                .ok_or_else(|| Error::InvalidConfig("chunk must have embedding".to_string()))?;
            vectors.push(embedding);
        }
        Self::build_with_metric(chunks, vectors, metric)
    }

    /// Top-`k` entries by descending score
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (_, vector))| (i, self.metric.score(query_vector, vector)))
            .collect();

        // Stable sort: equal scores keep insertion order
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);

        Ok(scores
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk: self.entries[i].0.clone(),
                score,
            })
            .collect())
    }

    /// Get an entry's chunk by insertion position
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.entries.get(position).map(|(chunk, _)| chunk)
    }

    /// Iterate over stored chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }

    /// Vector length shared by every entry (0 for an empty store)
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Metric used for every comparison
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get the number of stored vectors
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, content: &str) -> Chunk {
        Chunk::new(index, content.to_string())
    }

    fn store() -> VectorStore {
        VectorStore::build(
            vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        )
        .unwrap()
    }

    // ============ Build Tests ============

    #[test]
    fn test_build() {
        let store = store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(), 2);
        assert_eq!(store.metric(), DistanceMetric::Cosine);
        assert_eq!(store.get(1).unwrap().content, "b");
    }

    #[test]
    fn test_build_length_mismatch() {
        let result = VectorStore::build(vec![chunk(0, "a")], vec![]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_build_dimension_mismatch() {
        let result = VectorStore::build(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_build_rejects_empty_vectors() {
        let result = VectorStore::build(vec![chunk(0, "a")], vec![vec![]]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_embedded_chunks() {
        let mut c = chunk(0, "a");
        c.set_embedding(vec![1.0, 0.0]);
        let store = VectorStore::from_embedded_chunks(vec![c], DistanceMetric::DotProduct).unwrap();
        assert_eq!(store.len(), 1);

        let missing = VectorStore::from_embedded_chunks(vec![chunk(0, "a")], DistanceMetric::Cosine);
        assert!(missing.is_err());
    }

    #[test]
    fn test_embedded_chunks_store_vector_once() {
        let mut c = chunk(0, "a");
        c.set_embedding(vec![0.6, 0.8]);
        let store = VectorStore::from_embedded_chunks(vec![c], DistanceMetric::Cosine).unwrap();

        assert!(store.get(0).unwrap().embedding.is_none());
        let hits = store.search(&[0.6, 0.8], 1).unwrap();
        assert!(hits[0].chunk.embedding.is_none());

        let json = serde_json::to_value(&hits[0]).unwrap();
        assert!(json["chunk"].get("embedding").is_none());
        assert_eq!(json["chunk"]["content"], "a");
    }

    // ============ Search Tests ============

    #[test]
    fn test_search_orders_by_score() {
        let hits = store().search(&[1.0, 0.1], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.content, "a");
        assert_eq!(hits[1].chunk.content, "c");
        assert_eq!(hits[2].chunk.content, "b");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_search_k_zero() {
        assert!(store().search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_k_larger_than_store() {
        let hits = store().search(&[1.0, 0.0], 50).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_empty_store() {
        let empty = VectorStore::build(vec![], vec![]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.search(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_wrong_dimension() {
        let result = store().search(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let store = VectorStore::build(
            vec![chunk(0, "first"), chunk(1, "second"), chunk(2, "third")],
            vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();
        let hits = store.search(&[1.0, 0.0], 3).unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.chunk.record_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_dot_product_metric() {
        let store = VectorStore::build_with_metric(
            vec![chunk(0, "short"), chunk(1, "long")],
            vec![vec![1.0, 0.0], vec![3.0, 0.0]],
            DistanceMetric::DotProduct,
        )
        .unwrap();
        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk.content, "long");
        assert!((hits[0].score - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_metric_serde() {
        let json = serde_json::to_string(&DistanceMetric::DotProduct).unwrap();
        assert_eq!(json, "\"dot_product\"");
        let metric: DistanceMetric = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(metric, DistanceMetric::Cosine);
    }

    // ============ Property-Based Tests ============

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_search_returns_min_k_len(
            vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 4), 0..20),
            k in 0usize..30
        ) {
            let chunks: Vec<Chunk> = (0..vectors.len()).map(|i| chunk(i, "x")).collect();
            let len = vectors.len();
            let store = VectorStore::build(chunks, vectors).unwrap();
            let hits = store.search(&[0.5, -0.5, 0.25, 1.0], k).unwrap();
            prop_assert_eq!(hits.len(), k.min(len));

            let mut seen = std::collections::HashSet::new();
            for hit in &hits {
                prop_assert!(seen.insert(hit.chunk.id));
            }
            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
