//! Immutable index generations and the atomic swap handle.
//!
//! A generation is a complete snapshot: corpus, BM25 index, dense index,
//! ANN graph and the row mapping, built together and never mutated. The
//! [`GenerationHandle`] owns the current generation behind an `RwLock`;
//! a request clones the `Arc` once at its start, so every sub-lookup of
//! that request observes the same snapshot even if a rebuild swaps the
//! handle mid-flight. Old generations are reclaimed when the last request
//! holding them finishes.

use crate::corpus::CorpusStore;
use crate::record::FundRecord;
use fundrank_retrieve::bm25::{Bm25Params, InvertedIndex};
use fundrank_retrieve::dense::hnsw::HnswGraph;
use fundrank_retrieve::dense::DenseIndex;
use fundrank_retrieve::persistence::Manifest;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One immutable snapshot of the corpus and its indexes.
pub struct Generation {
    pub corpus: CorpusStore,
    pub bm25: InvertedIndex,
    pub bm25_params: Bm25Params,
    pub dense: DenseIndex,
    pub graph: HnswGraph,
    /// Row -> fund id (ascending fund id order).
    pub fund_ids: Vec<String>,
    /// Fund id -> row.
    pub rows: HashMap<String, u32>,
    pub manifest: Manifest,
}

impl Generation {
    /// Fund record for an index row.
    pub fn record_of_row(&self, row: u32) -> Option<&FundRecord> {
        self.fund_ids
            .get(row as usize)
            .and_then(|id| self.corpus.get(id))
    }

    /// Index row for a fund id.
    pub fn row_of(&self, fund_id: &str) -> Option<u32> {
        self.rows.get(fund_id).copied()
    }

    /// Number of indexed funds.
    pub fn len(&self) -> usize {
        self.fund_ids.len()
    }

    /// True when the generation indexes no funds.
    pub fn is_empty(&self) -> bool {
        self.fund_ids.is_empty()
    }
}

/// Shared handle to the active generation.
///
/// Cheap to clone; all clones observe the same swaps.
#[derive(Clone)]
pub struct GenerationHandle {
    inner: Arc<RwLock<Arc<Generation>>>,
}

impl GenerationHandle {
    pub fn new(generation: Generation) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(generation))),
        }
    }

    /// Pin the current generation for the duration of one request.
    pub fn current(&self) -> Arc<Generation> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replace the active generation.
    ///
    /// Readers that already pinned the old generation keep it until they
    /// drop their `Arc`.
    pub fn swap(&self, next: Generation) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundrank_retrieve::dense::hnsw::HnswParams;

    fn tiny_generation(marker: &str) -> Generation {
        let corpus = CorpusStore::from_records(vec![FundRecord {
            fund_id: "F1".to_string(),
            fund_name: marker.to_string(),
            fund_house: "SBI".to_string(),
            category: "Debt".to_string(),
            sub_category: None,
            asset_class: None,
            fund_type: None,
            sector: None,
            risk_level: None,
            expense_ratio: None,
            return_1yr: None,
            return_3yr: None,
            return_5yr: None,
            aum: None,
            top_holdings: Vec::new(),
            sector_allocation: Vec::new(),
            description: String::new(),
        }])
        .unwrap();

        let mut dense = DenseIndex::new(2).unwrap();
        dense.add(&[1.0, 0.0]).unwrap();
        let graph = HnswGraph::build(&dense, HnswParams::default()).unwrap();

        Generation {
            corpus,
            bm25: InvertedIndex::new(),
            bm25_params: Bm25Params::default(),
            dense,
            graph,
            fund_ids: vec!["F1".to_string()],
            rows: [("F1".to_string(), 0u32)].into_iter().collect(),
            manifest: Manifest {
                embedding_model: "hash-embedder/1".to_string(),
                embedding_dim: 2,
                corpus_checksum: "0".to_string(),
                built_at: "2026-01-01T00:00:00Z".to_string(),
            },
        }
    }

    #[test]
    fn test_row_lookup() {
        let generation = tiny_generation("Alpha");
        assert_eq!(generation.row_of("F1"), Some(0));
        assert_eq!(generation.record_of_row(0).unwrap().fund_name, "Alpha");
        assert!(generation.record_of_row(9).is_none());
    }

    #[test]
    fn test_pinned_generation_survives_swap() {
        let handle = GenerationHandle::new(tiny_generation("Old"));
        let pinned = handle.current();

        handle.swap(tiny_generation("New"));

        // The pinned snapshot still sees the old corpus...
        assert_eq!(pinned.record_of_row(0).unwrap().fund_name, "Old");
        // ...while new requests see the new one.
        assert_eq!(handle.current().record_of_row(0).unwrap().fund_name, "New");
    }
}
