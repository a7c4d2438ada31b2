use crate::hnsw::{HnswGraph, HnswParams};
use crate::{Error, Result, Vector};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Which search structure backs a [`VectorIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact scan over every vector
    #[default]
    Flat,
    /// Approximate HNSW graph; hits are re-sorted with the flat tie-break
    Hnsw,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub kind: IndexKind,
    pub hnsw: HnswParams,
}

/// One (id, embedding) pair handed to [`VectorIndex::build`]
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vector,
}

impl IndexEntry {
    pub fn new(id: impl Into<String>, vector: Vector) -> Self {
        Self {
            id: id.into(),
            vector,
        }
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Immutable nearest-neighbour index over unit-normalized vectors.
///
/// The metric is cosine similarity (dot product of unit vectors). Results
/// are ordered by similarity descending, ties broken by id ascending, so two
/// builds from the same entries answer every query identically.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    config: IndexConfig,
    dim: usize,
    /// Sorted ascending; a position doubles as the tie-break rank
    ids: Vec<String>,
    positions: AHashMap<String, usize>,
    /// Contiguous storage, `dim` floats per position
    vectors: Vec<f32>,
    graph: Option<HnswGraph>,
}

impl VectorIndex {
    /// An index with nothing in it; every search returns no hits
    pub fn empty(config: IndexConfig) -> Self {
        Self {
            config,
            dim: 0,
            ids: Vec::new(),
            positions: AHashMap::new(),
            vectors: Vec::new(),
            graph: None,
        }
    }

    /// Build from scratch.
    ///
    /// Fails with [`Error::DimensionMismatch`] when embeddings disagree in
    /// length, [`Error::EmptyVector`] for zero-length, zero-norm or
    /// non-finite embeddings and [`Error::DuplicateId`] for repeated ids.
    pub fn build(mut entries: Vec<IndexEntry>, config: IndexConfig) -> Result<Self> {
        if entries.is_empty() {
            return Ok(Self::empty(config));
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let dim = entries[0].vector.dim();
        let mut ids = Vec::with_capacity(entries.len());
        let mut positions = AHashMap::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len() * dim);

        for entry in entries {
            if entry.vector.dim() != dim {
                return Err(Error::DimensionMismatch {
                    id: entry.id,
                    expected: dim,
                    actual: entry.vector.dim(),
                });
            }
            if entry.vector.is_empty() || !entry.vector.is_finite() {
                return Err(Error::EmptyVector(entry.id));
            }
            let Some(unit) = entry.vector.normalized() else {
                return Err(Error::EmptyVector(entry.id));
            };
            if positions.insert(entry.id.clone(), ids.len()).is_some() {
                return Err(Error::DuplicateId(entry.id));
            }
            vectors.extend_from_slice(unit.as_slice());
            ids.push(entry.id);
        }

        let graph = match config.kind {
            IndexKind::Flat => None,
            IndexKind::Hnsw => {
                if config.hnsw.max_connections == 0 || config.hnsw.max_layers == 0 {
                    return Err(Error::InvalidConfig(
                        "hnsw max_connections and max_layers must be positive".to_string(),
                    ));
                }
                Some(HnswGraph::build(&vectors, dim, ids.len(), config.hnsw))
            }
        };

        Ok(Self {
            config,
            dim,
            ids,
            positions,
            vectors,
            graph,
        })
    }

    /// Up to `k` hits ordered by similarity descending, id ascending.
    ///
    /// An empty index answers with no hits. A query whose dimension differs
    /// from the index is rejected with [`Error::DimensionMismatch`]; a zero
    /// query also yields no hits.
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                id: "<query>".to_string(),
                expected: self.dim,
                actual: query.dim(),
            });
        }
        let Some(unit) = query.normalized() else {
            return Ok(Vec::new());
        };

        let candidates: Vec<usize> = match &self.graph {
            Some(graph) => graph
                .search(&self.vectors, self.dim, unit.as_slice(), k)
                .into_iter()
                .map(|(_, pos)| pos)
                .collect(),
            None => (0..self.ids.len()).collect(),
        };

        // graph hits are re-scored so both kinds report identical similarities
        let mut scored: Vec<(f32, usize)> = candidates
            .into_iter()
            .map(|pos| {
                let score = crate::simd::dot_product_simd(unit.as_slice(), self.vector_at(pos));
                (score, pos)
            })
            .collect();

        let key = |&(score, pos): &(f32, usize)| (Reverse(OrderedFloat(score)), pos);
        if scored.len() > k {
            scored.select_nth_unstable_by_key(k - 1, key);
            scored.truncate(k);
        }
        scored.sort_unstable_by_key(key);

        Ok(scored
            .into_iter()
            .map(|(score, pos)| SearchHit {
                id: self.ids[pos].clone(),
                score,
            })
            .collect())
    }

    #[inline]
    fn vector_at(&self, pos: usize) -> &[f32] {
        &self.vectors[pos * self.dim..(pos + 1) * self.dim]
    }

    /// Stored unit-length vector for `id`
    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&pos| self.vector_at(pos))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Ids in ascending order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Embedding dimension, 0 for an empty index
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("c", Vector::new(vec![0.0, 1.0, 0.0])),
            IndexEntry::new("a", Vector::new(vec![1.0, 0.0, 0.0])),
            IndexEntry::new("b", Vector::new(vec![2.0, 0.0, 0.0])),
            IndexEntry::new("d", Vector::new(vec![0.7, 0.7, 0.0])),
        ]
    }

    #[test]
    fn test_flat_search_ordering_and_ties() {
        let index = VectorIndex::build(entries(), IndexConfig::default()).unwrap();
        let hits = index.search(&Vector::new(vec![1.0, 0.0, 0.0]), 3).unwrap();

        // a and b are identical after normalization; id breaks the tie
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
        assert_eq!(hits[2].id, "d");
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::build(Vec::new(), IndexConfig::default()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&Vector::new(vec![1.0]), 5).unwrap().is_empty());

        let unbuilt = VectorIndex::empty(IndexConfig::default());
        assert!(unbuilt.search(&Vector::new(vec![1.0, 2.0]), 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_on_build() {
        let mut bad = entries();
        bad.push(IndexEntry::new("e", Vector::new(vec![1.0, 0.0])));
        let err = VectorIndex::build(bad, IndexConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_zero_vector_and_duplicate_rejected() {
        let zero = vec![IndexEntry::new("z", Vector::zeros(3))];
        assert!(matches!(
            VectorIndex::build(zero, IndexConfig::default()),
            Err(Error::EmptyVector(_))
        ));

        let mut dup = entries();
        dup.push(IndexEntry::new("a", Vector::new(vec![0.0, 0.0, 1.0])));
        assert!(matches!(
            VectorIndex::build(dup, IndexConfig::default()),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = VectorIndex::build(entries(), IndexConfig::default()).unwrap();
        assert!(index.search(&Vector::new(vec![1.0]), 2).is_err());
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = VectorIndex::build(entries(), IndexConfig::default()).unwrap();
        let hits = index.search(&Vector::new(vec![0.0, 1.0, 0.0]), 50).unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].id, "c");
    }

    #[test]
    fn test_hnsw_kind_matches_flat_top_hit() {
        let config = IndexConfig {
            kind: IndexKind::Hnsw,
            ..IndexConfig::default()
        };
        let hnsw = VectorIndex::build(entries(), config).unwrap();
        let flat = VectorIndex::build(entries(), IndexConfig::default()).unwrap();

        let query = Vector::new(vec![0.1, 0.9, 0.0]);
        let a = hnsw.search(&query, 4).unwrap();
        let b = flat.search(&query, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stored_vectors_are_unit_length() {
        let index = VectorIndex::build(entries(), IndexConfig::default()).unwrap();
        let b = index.vector("b").unwrap();
        assert!((b[0] - 1.0).abs() < 1e-6);
        assert!(index.vector("missing").is_none());
        assert_eq!(index.ids(), &["a", "b", "c", "d"]);
    }
}
