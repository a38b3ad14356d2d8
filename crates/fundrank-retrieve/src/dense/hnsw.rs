//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor
//! search.
//!
//! Pure Rust implementation over the [`DenseIndex`] vector storage. The
//! graph holds only topology (neighbor lists and layer assignments); the
//! vectors themselves stay in the dense index, so the two persist as
//! separate artifacts.
//!
//! # Algorithm
//!
//! HNSW constructs a multi-layer graph where:
//! - **Upper layers**: sparse, long-range connections for fast navigation
//! - **Base layer**: dense, local connections for precise search
//! - **Search**: start at the top layer entry point, greedily descend to the
//!   base layer, then run a beam search of width `ef`
//!
//! Layer assignment uses the standard geometric distribution with a seeded
//! RNG, so building the same vectors twice produces the same graph. This is
//! what makes engine results reproducible across rebuilds of an unchanged
//! corpus.
//!
//! # References
//!
//! - Malkov & Yashunin (2016): "Efficient and robust approximate nearest
//!   neighbor search using Hierarchical Navigable Small World graphs"

use crate::dense::{dot, DenseIndex};
use crate::error::RetrieveError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BinaryHeap, HashSet};

/// Hard cap on graph height; layers above this are statistically unreachable.
const MAX_LAYER: u8 = 12;

type Neighbors = SmallVec<[u32; 16]>;

/// HNSW parameters controlling graph structure and search behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswParams {
    /// Maximum connections per node in upper layers (typically 16)
    pub m: usize,

    /// Maximum connections per node in the base layer (typically 16)
    pub m_max: usize,

    /// Layer assignment probability parameter (typically 1/ln(2) ≈ 1.44)
    pub m_l: f64,

    /// Search width during construction (typically 200)
    pub ef_construction: usize,

    /// Default search width during query (typically 50-200)
    pub ef_search: usize,

    /// RNG seed for layer assignment. Fixed so builds are deterministic.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            m_max: 16,
            m_l: 1.0 / 2.0_f64.ln(),
            ef_construction: 200,
            ef_search: 50,
            seed: 0x6675_6e64,
        }
    }
}

/// Cosine distance for unit-norm vectors: 1 - dot product, in [0, 2].
#[inline]
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot(a, b)
}

/// Candidate node during search (min-heap by distance).
#[derive(Clone, PartialEq)]
struct Candidate {
    id: u32,
    distance: f32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // Min-heap: smaller distance = higher priority
        other.distance.partial_cmp(&self.distance)
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// HNSW graph over an external [`DenseIndex`].
///
/// Supports bulk [`build`](HnswGraph::build), append-only extension via
/// [`add`](HnswGraph::add), and [`search`](HnswGraph::search). Serializable
/// for the persisted `graph.bin` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswGraph {
    params: HnswParams,

    /// Graph layers (index 0 = base layer). Each layer holds one neighbor
    /// list per node; nodes absent from a layer have an empty list.
    layers: Vec<Vec<Neighbors>>,

    /// Highest layer each node appears in.
    layer_assignments: Vec<u8>,

    /// Entry point: a node on the highest occupied layer.
    entry_point: u32,
}

impl HnswGraph {
    /// Build a graph over every vector currently in the index.
    pub fn build(index: &DenseIndex, params: HnswParams) -> Result<Self, RetrieveError> {
        if params.m == 0 || params.m_max == 0 || params.ef_construction == 0 {
            return Err(RetrieveError::InvalidParameter(
                "m, m_max and ef_construction must be positive".to_string(),
            ));
        }
        let mut graph = Self {
            params,
            layers: Vec::new(),
            layer_assignments: Vec::new(),
            entry_point: 0,
        };
        for row in 0..index.len() as u32 {
            graph.add(index, row)?;
        }
        Ok(graph)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.layer_assignments.len()
    }

    /// True if the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.layer_assignments.is_empty()
    }

    /// Graph parameters as used at build time.
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Deterministic geometric layer assignment for a row.
    fn assign_layer(&self, row: u32) -> u8 {
        let mut rng =
            StdRng::seed_from_u64(self.params.seed ^ (row as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
        let level = (-u.ln() * self.params.m_l) as u64;
        level.min(MAX_LAYER as u64) as u8
    }

    /// Append the next row of the index to the graph.
    ///
    /// Rows must be added in order; the graph mirrors the dense index row
    /// space exactly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `row` is not the next expected row and
    /// `DimensionMismatch`/`EmptyIndex` when the index disagrees with the
    /// graph.
    pub fn add(&mut self, index: &DenseIndex, row: u32) -> Result<(), RetrieveError> {
        if row as usize != self.layer_assignments.len() {
            return Err(RetrieveError::InvalidParameter(format!(
                "rows must be appended in order: expected {}, got {}",
                self.layer_assignments.len(),
                row
            )));
        }
        if (row as usize) >= index.len() {
            return Err(RetrieveError::InvalidParameter(format!(
                "row {} is not present in the dense index",
                row
            )));
        }

        let level = self.assign_layer(row);
        let old_top = self.layers.len().saturating_sub(1);
        let node_count = self.layer_assignments.len();

        // Grow every existing layer by one node slot, then any new layers.
        for layer in &mut self.layers {
            layer.push(Neighbors::new());
        }
        while self.layers.len() <= level as usize {
            self.layers.push(vec![Neighbors::new(); node_count + 1]);
        }
        self.layer_assignments.push(level);

        if node_count == 0 {
            self.entry_point = row;
            return Ok(());
        }

        let query = index.vector(row).to_vec();

        // Greedy descent through layers above the insertion level.
        let mut ep = self.entry_point;
        for layer_idx in ((level as usize + 1)..=old_top).rev() {
            let found = self.search_layer(index, &query, ep, layer_idx, 1);
            if let Some(&(closest, _)) = found.first() {
                ep = closest;
            }
        }

        // Link into each layer from the insertion level down to the base.
        for layer_idx in (0..=(level as usize).min(old_top)).rev() {
            let candidates =
                self.search_layer(index, &query, ep, layer_idx, self.params.ef_construction);
            if let Some(&(closest, _)) = candidates.first() {
                ep = closest;
            }

            let m_target = if layer_idx == 0 {
                self.params.m_max
            } else {
                self.params.m
            };
            let selected = select_neighbors(index, &query, &candidates, m_target);

            let layer = &mut self.layers[layer_idx];
            for &neighbor_id in &selected {
                if !layer[row as usize].contains(&neighbor_id) {
                    layer[row as usize].push(neighbor_id);
                }
                if !layer[neighbor_id as usize].contains(&row) {
                    layer[neighbor_id as usize].push(row);
                }
                if layer[neighbor_id as usize].len() > m_target {
                    prune_neighbors(index, neighbor_id, &mut layer[neighbor_id as usize], m_target);
                }
            }
        }

        if (level as usize) >= self.layers.len().saturating_sub(1)
            && level >= self.layer_assignments[self.entry_point as usize]
        {
            self.entry_point = row;
        }
        Ok(())
    }

    /// Beam search within a single layer.
    ///
    /// Returns up to `ef` nodes sorted by ascending distance to the query.
    fn search_layer(
        &self,
        index: &DenseIndex,
        query: &[f32],
        entry: u32,
        layer_idx: usize,
        ef: usize,
    ) -> Vec<(u32, f32)> {
        let layer = &self.layers[layer_idx];
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
        let mut visited: HashSet<u32> = HashSet::with_capacity(ef * 2);
        let mut results: Vec<(u32, f32)> = Vec::with_capacity(ef);

        let entry_distance = cosine_distance(query, index.vector(entry));
        candidates.push(Candidate {
            id: entry,
            distance: entry_distance,
        });

        while let Some(candidate) = candidates.pop() {
            if !visited.insert(candidate.id) {
                continue;
            }
            results.push((candidate.id, candidate.distance));
            if results.len() >= ef {
                break;
            }

            for &neighbor_id in layer[candidate.id as usize].iter() {
                if !visited.contains(&neighbor_id) {
                    candidates.push(Candidate {
                        id: neighbor_id,
                        distance: cosine_distance(query, index.vector(neighbor_id)),
                    });
                }
            }
        }

        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results
    }

    /// Retrieve the approximate top-k rows by inner-product similarity.
    ///
    /// The query is normalized internally. `ef` widens the base-layer beam;
    /// it is clamped to at least `k`. Results carry similarities in [-1, 1],
    /// sorted descending with ties broken by ascending row id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for a query of the wrong dimension and
    /// `InvalidVector` for a zero or non-finite query.
    pub fn search(
        &self,
        index: &DenseIndex,
        query: &[f32],
        k: usize,
        ef: usize,
    ) -> Result<Vec<(u32, f32)>, RetrieveError> {
        if query.len() != index.dimension() {
            return Err(RetrieveError::DimensionMismatch {
                query_dim: query.len(),
                index_dim: index.dimension(),
            });
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = DenseIndex::normalize(query)
            .ok_or_else(|| RetrieveError::InvalidVector("zero or non-finite query".to_string()))?;

        // Greedy descent to the base layer.
        let mut ep = self.entry_point;
        for layer_idx in (1..self.layers.len()).rev() {
            let found = self.search_layer(index, &query, ep, layer_idx, 1);
            if let Some(&(closest, _)) = found.first() {
                ep = closest;
            }
        }

        let beam = self.search_layer(index, &query, ep, 0, ef.max(k));
        let mut heap = crate::bm25::TopK::new(k);
        for (id, distance) in beam {
            heap.push(id, 1.0 - distance);
        }
        Ok(heap.into_sorted())
    }
}

/// Select up to `m` diverse neighbors from candidates sorted by distance.
///
/// Uses relative neighborhood pruning: a candidate is kept only when it is
/// closer to the query than to every already-selected neighbor, then the
/// remaining slots are filled closest-first.
fn select_neighbors(
    index: &DenseIndex,
    query: &[f32],
    candidates: &[(u32, f32)],
    m: usize,
) -> Vec<u32> {
    let mut selected: Vec<u32> = Vec::with_capacity(m.min(candidates.len()));

    for &(candidate_id, query_distance) in candidates {
        if selected.len() >= m {
            break;
        }
        let candidate_vec = index.vector(candidate_id);
        let keep = selected.iter().all(|&selected_id| {
            query_distance < cosine_distance(index.vector(selected_id), candidate_vec)
        });
        if keep {
            selected.push(candidate_id);
        }
    }

    for &(candidate_id, _) in candidates {
        if selected.len() >= m {
            break;
        }
        if !selected.contains(&candidate_id) {
            selected.push(candidate_id);
        }
    }

    selected
}

/// Trim a neighbor list to the `m` closest entries.
fn prune_neighbors(index: &DenseIndex, node: u32, neighbors: &mut Neighbors, m: usize) {
    let node_vec = index.vector(node);
    let mut by_distance: Vec<(u32, f32)> = neighbors
        .iter()
        .map(|&id| (id, cosine_distance(node_vec, index.vector(id))))
        .collect();
    by_distance.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    by_distance.truncate(m);
    *neighbors = by_distance.into_iter().map(|(id, _)| id).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_index(n: usize) -> DenseIndex {
        // Vectors fan out in a quarter circle so nearest neighbors are
        // unambiguous.
        let mut index = DenseIndex::new(2).unwrap();
        for i in 0..n {
            let angle = (i as f32) / (n as f32) * std::f32::consts::FRAC_PI_2;
            index.add(&[angle.cos(), angle.sin()]).unwrap();
        }
        index
    }

    #[test]
    fn test_build_and_search() {
        let index = axis_index(64);
        let graph = HnswGraph::build(&index, HnswParams::default()).unwrap();
        assert_eq!(graph.len(), 64);

        let results = graph.search(&index, &[1.0, 0.0], 5, 50).unwrap();
        assert_eq!(results.len(), 5);
        // Row 0 points exactly along the query axis.
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.99);
        // Similarities are descending.
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_matches_brute_force_top1() {
        let index = axis_index(128);
        let graph = HnswGraph::build(&index, HnswParams::default()).unwrap();

        for query in [[1.0f32, 0.0], [0.0, 1.0], [0.7, 0.7]] {
            let exact = index.retrieve(&query, 1).unwrap();
            let approx = graph.search(&index, &query, 1, 64).unwrap();
            assert_eq!(exact[0].0, approx[0].0);
        }
    }

    #[test]
    fn test_deterministic_builds() {
        let index = axis_index(48);
        let a = HnswGraph::build(&index, HnswParams::default()).unwrap();
        let b = HnswGraph::build(&index, HnswParams::default()).unwrap();

        let ra = a.search(&index, &[0.5, 0.5], 10, 50).unwrap();
        let rb = b.search(&index, &[0.5, 0.5], 10, 50).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_append_after_build() {
        let mut index = axis_index(16);
        let mut graph = HnswGraph::build(&index, HnswParams::default()).unwrap();

        let row = index.add(&[0.0, 1.0]).unwrap();
        graph.add(&index, row).unwrap();
        assert_eq!(graph.len(), 17);

        let results = graph.search(&index, &[0.0, 1.0], 1, 32).unwrap();
        assert_eq!(results[0].0, row);
    }

    #[test]
    fn test_out_of_order_append_rejected() {
        let index = axis_index(4);
        let mut graph = HnswGraph::build(&index, HnswParams::default()).unwrap();
        assert!(graph.add(&index, 9).is_err());
    }

    #[test]
    fn test_empty_graph_search() {
        let index = DenseIndex::new(2).unwrap();
        let graph = HnswGraph::build(&index, HnswParams::default()).unwrap();
        assert!(graph.search(&index, &[1.0, 0.0], 3, 10).unwrap().is_empty());
    }
}
