//! First-stage retrieval for the fundrank pipeline.
//!
//! This crate narrows a fund corpus down to a manageable candidate set for
//! reranking. It is deliberately domain-agnostic: documents are dense `u32`
//! row ids, and the mapping between rows and fund identifiers lives in the
//! layer above.
//!
//! # Pipeline Stage
//!
//! The retrieval pipeline flows as:
//! - corpus -> ~100 candidates (BM25 + dense ANN, fast)
//! - ~100 -> k results (rerank, precise)
//!
//! # Design Philosophy
//!
//! Two in-memory indexes cooperate:
//! - [`bm25::InvertedIndex`] for keyword- and name-heavy queries
//! - [`dense::DenseIndex`] (with an optional [`dense::hnsw::HnswGraph`]) for
//!   semantic recall over L2-normalized embeddings
//!
//! Both return the same output shape (`Vec<(u32, f32)>`, score descending,
//! ties broken by ascending row id) so the candidate generator can
//! union-merge their results without caring which side produced a row.
//!
//! Indexes are immutable once built into a generation; the [`persistence`]
//! module writes and restores them as a set of stable on-disk artifacts.
//!
//! # Quick Start
//!
//! ```rust
//! use fundrank_retrieve::bm25::{Bm25Params, InvertedIndex};
//!
//! let mut index = InvertedIndex::new();
//! index.add_document(0, &["large".to_string(), "cap".to_string()]);
//!
//! let query = vec!["large".to_string()];
//! let results = index.retrieve(&query, 10, Bm25Params::default());
//! assert_eq!(results[0].0, 0);
//! ```

/// BM25 retrieval module.
///
/// Provides inverted index and Okapi BM25 scoring.
pub mod bm25;

/// Dense retrieval over L2-normalized embedding vectors.
///
/// Provides brute-force inner-product retrieval and a graph-based ANN
/// index for larger corpora.
pub mod dense;

/// Error types for retrieval and persistence operations.
pub mod error;

/// Disk persistence for index artifacts.
pub mod persistence;

pub use error::{PersistenceError, RetrieveError};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::bm25::{Bm25Params, InvertedIndex};
    pub use crate::dense::hnsw::{HnswGraph, HnswParams};
    pub use crate::dense::DenseIndex;
    pub use crate::error::{PersistenceError, RetrieveError};
}
