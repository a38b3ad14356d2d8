//! Dense retrieval over L2-normalized embedding vectors.
//!
//! The dense index stores one embedding per corpus row in a flat
//! structure-of-arrays buffer and retrieves by inner product, which equals
//! cosine similarity for unit-norm vectors.
//!
//! Two retrieval paths are provided:
//!
//! - [`DenseIndex::retrieve`] / [`DenseIndex::retrieve_filtered`]:
//!   brute-force scan, exact, O(n·d). Used for hard-filtered candidate
//!   pools where the pool is already small.
//! - [`hnsw::HnswGraph`]: graph-based approximate nearest neighbor search
//!   over the same vector storage, O(log n) per query. Used for full-corpus
//!   semantic recall.
//!
//! Vectors are normalized by the index on insert, so the embedding provider
//! only has to be deterministic; its output norm does not matter as long as
//! it is non-zero and finite.

use crate::error::RetrieveError;
use std::collections::HashSet;

pub mod hnsw;

/// Dense vector index with normalize-on-insert semantics.
///
/// Rows are implicit: the first added vector is row 0, the next row 1, and
/// so on, matching the corpus row order established at build time.
#[derive(Debug, Clone)]
pub struct DenseIndex {
    /// Vectors stored in Structure of Arrays (SoA) format
    /// Layout: [v0[0..d], v1[0..d], ..., vn[0..d]]
    vectors: Vec<f32>,

    /// Vector dimension
    dimension: usize,

    /// Number of vectors
    num_vectors: usize,
}

impl DenseIndex {
    /// Create a new empty index for vectors of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns `RetrieveError::InvalidParameter` if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self, RetrieveError> {
        if dimension == 0 {
            return Err(RetrieveError::InvalidParameter(
                "dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            vectors: Vec::new(),
            dimension,
            num_vectors: 0,
        })
    }

    /// Add a vector, returning its row id.
    ///
    /// The vector is L2-normalized before storage.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the vector has the wrong dimension and
    /// `InvalidVector` if any component is non-finite or the norm is zero.
    pub fn add(&mut self, vector: &[f32]) -> Result<u32, RetrieveError> {
        if vector.len() != self.dimension {
            return Err(RetrieveError::DimensionMismatch {
                query_dim: vector.len(),
                index_dim: self.dimension,
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(RetrieveError::InvalidVector(
                "non-finite component".to_string(),
            ));
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(RetrieveError::InvalidVector("zero norm".to_string()));
        }

        self.vectors.extend(vector.iter().map(|x| x / norm));
        let row = self.num_vectors as u32;
        self.num_vectors += 1;
        Ok(row)
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.num_vectors
    }

    /// True if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.num_vectors == 0
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the stored (normalized) vector for a row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn vector(&self, row: u32) -> &[f32] {
        let start = row as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Raw vector storage in row-major SoA layout (for persistence).
    pub fn raw_vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// Rebuild an index from raw row-major storage (for persistence).
    pub(crate) fn from_raw(
        vectors: Vec<f32>,
        dimension: usize,
    ) -> Result<Self, RetrieveError> {
        if dimension == 0 || vectors.len() % dimension != 0 {
            return Err(RetrieveError::InvalidParameter(format!(
                "raw storage of {} floats is not a multiple of dimension {}",
                vectors.len(),
                dimension
            )));
        }
        let num_vectors = vectors.len() / dimension;
        Ok(Self {
            vectors,
            dimension,
            num_vectors,
        })
    }

    /// Inner-product similarity between a unit-norm query and a stored row.
    pub fn similarity(&self, query: &[f32], row: u32) -> f32 {
        dot(query, self.vector(row))
    }

    /// Normalize a query vector to unit length.
    ///
    /// Returns `None` for zero or non-finite input.
    pub fn normalize(query: &[f32]) -> Option<Vec<f32>> {
        if query.iter().any(|x| !x.is_finite()) {
            return None;
        }
        let norm: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return None;
        }
        Some(query.iter().map(|x| x / norm).collect())
    }

    /// Retrieve top-k rows by inner-product similarity (brute force).
    ///
    /// The query is normalized internally. Similarities are in [-1, 1];
    /// ties are broken by ascending row id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for a query of the wrong dimension and
    /// `InvalidVector` for a zero or non-finite query.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, RetrieveError> {
        self.retrieve_filtered(query, k, None)
    }

    /// Retrieve top-k rows, optionally restricted to an allowed pool.
    pub fn retrieve_filtered(
        &self,
        query: &[f32],
        k: usize,
        allow: Option<&HashSet<u32>>,
    ) -> Result<Vec<(u32, f32)>, RetrieveError> {
        if query.len() != self.dimension {
            return Err(RetrieveError::DimensionMismatch {
                query_dim: query.len(),
                index_dim: self.dimension,
            });
        }
        if self.num_vectors == 0 || k == 0 {
            return Ok(Vec::new());
        }
        let query = Self::normalize(query)
            .ok_or_else(|| RetrieveError::InvalidVector("zero or non-finite query".to_string()))?;

        let mut heap = crate::bm25::TopK::new(k);
        match allow {
            Some(pool) => {
                for &row in pool {
                    if (row as usize) < self.num_vectors {
                        heap.push(row, self.similarity(&query, row));
                    }
                }
            }
            None => {
                for row in 0..self.num_vectors as u32 {
                    heap.push(row, self.similarity(&query, row));
                }
            }
        }
        Ok(heap.into_sorted())
    }
}

/// Dot product of two equal-length slices.
#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
