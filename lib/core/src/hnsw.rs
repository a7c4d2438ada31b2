use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Tuning knobs for the HNSW graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Neighbours kept per node on upper layers (layer 0 keeps twice as many)
    pub max_connections: usize,
    pub max_layers: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    /// Seed for level assignment; a fixed seed makes rebuilds reproducible
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_layers: 4,
            ef_construction: 200,
            ef_search: 64,
            seed: 0x5eed_f00d,
        }
    }
}

/// Bit set for visited-node tracking, cleared in O(1) by bumping a generation
#[derive(Clone)]
struct VisitedSet {
    bits: Vec<u64>,
    generation: u64,
    generations: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64).max(1);
        Self {
            bits: vec![0; num_words],
            generation: 1,
            generations: vec![0; num_words],
        }
    }

    #[inline]
    fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.generation = 1;
            self.bits.fill(0);
            self.generations.fill(0);
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, capacity: usize) {
        let num_words = capacity.div_ceil(64);
        if num_words > self.bits.len() {
            self.bits.resize(num_words, 0);
            self.generations.resize(num_words, 0);
        }
    }

    /// Mark `idx`; true if it was not yet visited in this generation
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word_idx = idx / 64;
        let mask = 1u64 << (idx % 64);

        if word_idx >= self.bits.len() {
            self.ensure_capacity(idx + 1);
        }

        if self.generations[word_idx] != self.generation {
            self.bits[word_idx] = 0;
            self.generations[word_idx] = self.generation;
        }

        let was_set = (self.bits[word_idx] & mask) != 0;
        self.bits[word_idx] |= mask;
        !was_set
    }

    #[cfg(test)]
    fn contains(&self, idx: usize) -> bool {
        let word_idx = idx / 64;
        if word_idx >= self.bits.len() || self.generations[word_idx] != self.generation {
            return false;
        }
        (self.bits[word_idx] & (1u64 << (idx % 64))) != 0
    }
}

/// (distance, position). Ordering on the position makes every heap
/// operation deterministic when distances tie.
type Scored = (OrderedFloat<f32>, usize);

/// HNSW graph over positions in a contiguous, unit-normalized vector buffer.
///
/// The graph owns only adjacency; vectors stay in the owning index and are
/// passed in on every call, which keeps `search` free of interior mutability.
#[derive(Debug, Clone)]
pub(crate) struct HnswGraph {
    params: HnswParams,
    /// nodes[position][layer] = neighbour positions
    nodes: Vec<Vec<Vec<usize>>>,
    entry_point: Option<usize>,
    top_layer: usize,
}

impl HnswGraph {
    /// Build by inserting positions `0..count` in order
    pub(crate) fn build(vectors: &[f32], dim: usize, count: usize, params: HnswParams) -> Self {
        let mut graph = Self {
            params,
            nodes: Vec::with_capacity(count),
            entry_point: None,
            top_layer: 0,
        };
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut visited = VisitedSet::new(count);

        for idx in 0..count {
            let level = graph.select_layer(&mut rng);
            graph.insert(vectors, dim, idx, level, &mut visited);
        }
        graph
    }

    /// Exponentially decaying level assignment
    fn select_layer(&self, rng: &mut StdRng) -> usize {
        let mut layer = 0;
        while layer + 1 < self.params.max_layers && rng.random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    #[inline]
    fn vector(vectors: &[f32], dim: usize, idx: usize) -> &[f32] {
        &vectors[idx * dim..(idx + 1) * dim]
    }

    #[inline]
    fn distance(vectors: &[f32], dim: usize, query: &[f32], idx: usize) -> f32 {
        1.0 - crate::simd::dot_product_simd(query, Self::vector(vectors, dim, idx))
    }

    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.max_connections * 2
        } else {
            self.params.max_connections
        }
    }

    fn insert(
        &mut self,
        vectors: &[f32],
        dim: usize,
        idx: usize,
        level: usize,
        visited: &mut VisitedSet,
    ) {
        self.nodes.push(vec![Vec::new(); level + 1]);

        let Some(mut entry) = self.entry_point else {
            self.entry_point = Some(idx);
            self.top_layer = level;
            return;
        };

        let query = Self::vector(vectors, dim, idx);

        // greedy descent through layers above the new node's level
        let mut layer = self.top_layer;
        while layer > level {
            if let Some(&(_, closest)) = self
                .search_layer(vectors, dim, query, entry, 1, layer, visited)
                .first()
            {
                entry = closest;
            }
            layer -= 1;
        }

        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates =
                self.search_layer(vectors, dim, query, entry, self.params.ef_construction, layer, visited);
            let neighbors: Vec<usize> = candidates
                .iter()
                .take(self.params.max_connections)
                .map(|&(_, pos)| pos)
                .collect();

            self.nodes[idx][layer] = neighbors.clone();

            let capacity = self.layer_capacity(layer);
            for &neighbor in &neighbors {
                if layer >= self.nodes[neighbor].len() {
                    continue;
                }
                self.nodes[neighbor][layer].push(idx);
                if self.nodes[neighbor][layer].len() > capacity {
                    self.prune(vectors, dim, neighbor, layer, capacity);
                }
            }

            if let Some(&(_, closest)) = candidates.first() {
                entry = closest;
            }
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(idx);
        }
    }

    /// Keep the `capacity` closest links of `node` on `layer`
    fn prune(&mut self, vectors: &[f32], dim: usize, node: usize, layer: usize, capacity: usize) {
        let base = Self::vector(vectors, dim, node);
        let mut links: Vec<Scored> = self.nodes[node][layer]
            .iter()
            .map(|&pos| (OrderedFloat(Self::distance(vectors, dim, base, pos)), pos))
            .collect();
        links.sort_unstable();
        links.truncate(capacity);
        self.nodes[node][layer] = links.into_iter().map(|(_, pos)| pos).collect();
    }

    /// Best-first search on one layer; returns (distance, position) ascending
    #[allow(clippy::too_many_arguments)]
    fn search_layer(
        &self,
        vectors: &[f32],
        dim: usize,
        query: &[f32],
        entry: usize,
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
    ) -> Vec<(f32, usize)> {
        visited.clear();
        visited.ensure_capacity(self.nodes.len());

        let ef = ef.max(1);
        let entry_dist = OrderedFloat(Self::distance(vectors, dim, query, entry));

        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);
        candidates.push(Reverse((entry_dist, entry)));
        results.push((entry_dist, entry));
        visited.insert(entry);

        while let Some(Reverse(current)) = candidates.pop() {
            let worst = results.peek().copied().unwrap_or(current);
            if results.len() >= ef && current > worst {
                break;
            }

            let (_, current_idx) = current;
            let Some(links) = self.nodes[current_idx].get(layer) else {
                continue;
            };

            for &neighbor in links {
                if !visited.insert(neighbor) {
                    continue;
                }
                let scored = (OrderedFloat(Self::distance(vectors, dim, query, neighbor)), neighbor);
                let admit = results.len() < ef || results.peek().is_some_and(|w| scored < *w);
                if admit {
                    candidates.push(Reverse(scored));
                    results.push(scored);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut ordered = results.into_sorted_vec();
        ordered.dedup_by_key(|(_, pos)| *pos);
        ordered.into_iter().map(|(d, pos)| (d.0, pos)).collect()
    }

    /// Approximate k nearest positions to a unit-length query, as
    /// (similarity, position) with similarity descending
    pub(crate) fn search(&self, vectors: &[f32], dim: usize, query: &[f32], k: usize) -> Vec<(f32, usize)> {
        let Some(mut entry) = self.entry_point else {
            return Vec::new();
        };
        let mut visited = VisitedSet::new(self.nodes.len());

        for layer in (1..=self.top_layer).rev() {
            if let Some(&(_, closest)) = self
                .search_layer(vectors, dim, query, entry, 1, layer, &mut visited)
                .first()
            {
                entry = closest;
            }
        }

        let ef = self.params.ef_search.max(k);
        self.search_layer(vectors, dim, query, entry, ef, 0, &mut visited)
            .into_iter()
            .map(|(dist, pos)| (1.0 - dist, pos))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vectors(count: usize, dim: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(count * dim);
        for i in 0..count {
            let raw: Vec<f32> = (0..dim)
                .map(|d| ((i * 31 + d * 17) % 23) as f32 - 11.0)
                .collect();
            let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
            out.extend(raw.iter().map(|x| x / norm));
        }
        out
    }

    #[test]
    fn test_hnsw_finds_exact_match() {
        let dim = 8;
        let count = 200;
        let vectors = unit_vectors(count, dim);
        let graph = HnswGraph::build(&vectors, dim, count, HnswParams::default());

        let query = &vectors[42 * dim..43 * dim];
        let results = graph.search(&vectors, dim, query, 5);
        assert!(!results.is_empty());
        assert!(results.len() <= HnswParams::default().ef_search);
        assert!((results[0].0 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hnsw_build_is_reproducible() {
        let dim = 6;
        let count = 150;
        let vectors = unit_vectors(count, dim);
        let a = HnswGraph::build(&vectors, dim, count, HnswParams::default());
        let b = HnswGraph::build(&vectors, dim, count, HnswParams::default());

        let query = &vectors[7 * dim..8 * dim];
        assert_eq!(a.search(&vectors, dim, query, 10), b.search(&vectors, dim, query, 10));
    }

    #[test]
    fn test_visited_set() {
        let mut vs = VisitedSet::new(100);

        assert!(!vs.contains(5));
        assert!(vs.insert(5));
        assert!(vs.contains(5));
        assert!(!vs.insert(5));

        vs.clear();
        assert!(!vs.contains(5));
        assert!(vs.insert(5));

        // grows on demand
        assert!(vs.insert(1000));
    }
}
