//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for indexing, candidate generation and reranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// BM25 term frequency saturation.
    pub k1: f32,
    /// BM25 length normalization.
    pub b: f32,
    /// Lexical candidate breadth floor.
    pub k_bm25: usize,
    /// Dense candidate breadth floor.
    pub k_ann: usize,
    /// Weight of the semantic subscore.
    pub w_sem: f32,
    /// Weight of the metadata subscore.
    pub w_meta: f32,
    /// Weight of the fuzzy subscore.
    pub w_fuzz: f32,
    /// Relative tolerance band for numeric partial credit.
    pub partial_credit_band: f32,
    /// Expected embedding dimension. `None` means "trust the embedder".
    pub embedding_dim: Option<usize>,
    /// Pool size at or below which ANN/BM25 ranking is skipped and the
    /// whole filtered pool goes straight to the reranker.
    pub small_pool_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            k_bm25: 50,
            k_ann: 50,
            w_sem: 0.6,
            w_meta: 0.3,
            w_fuzz: 0.1,
            partial_credit_band: 0.20,
            embedding_dim: None,
            small_pool_threshold: 200,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    ///
    /// The three final-score weights must sum to 1.0 (within 1e-6), and the
    /// numeric tunables must be positive.
    pub fn validate(&self) -> Result<(), String> {
        let weight_sum = self.w_sem + self.w_meta + self.w_fuzz;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(format!(
                "score weights must sum to 1.0, got {}",
                weight_sum
            ));
        }
        if self.w_sem < 0.0 || self.w_meta < 0.0 || self.w_fuzz < 0.0 {
            return Err("score weights must be non-negative".to_string());
        }
        if self.k1 <= 0.0 || !(0.0..=1.0).contains(&self.b) {
            return Err(format!("invalid BM25 parameters k1={} b={}", self.k1, self.b));
        }
        if self.k_bm25 == 0 || self.k_ann == 0 {
            return Err("candidate breadths must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.partial_credit_band) {
            return Err(format!(
                "partial_credit_band {} outside [0, 1)",
                self.partial_credit_band
            ));
        }
        Ok(())
    }

    /// Lexical breadth for a requested top-k: `max(3k, k_bm25)`.
    pub fn bm25_breadth(&self, k: usize) -> usize {
        (3 * k).max(self.k_bm25)
    }

    /// Dense breadth for a requested top-k: `max(3k, k_ann)`.
    pub fn ann_breadth(&self, k: usize) -> usize {
        (3 * k).max(self.k_ann)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weight_sum_enforced() {
        let config = EngineConfig {
            w_sem: 0.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_breadths() {
        let config = EngineConfig::default();
        assert_eq!(config.bm25_breadth(5), 50);
        assert_eq!(config.ann_breadth(40), 120);
    }
}
