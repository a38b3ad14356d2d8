//! Embedding provider port.
//!
//! The engine treats the embedding model as an injected capability: any
//! provider that is deterministic for a given model version and honors the
//! declared dimension can back the dense index. The index applies its own
//! L2 normalization, so providers do not have to return unit vectors.

use crate::error::EmbedError;
use async_trait::async_trait;

/// Embedding provider contract.
///
/// `embed` must be deterministic for a fixed `model_id`; the engine records
/// the model id in the build manifest and refuses to mix artifacts across
/// model versions.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a `dimension()`-sized vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a batch of texts. The default implementation loops.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Output dimensionality.
    fn dimension(&self) -> usize;

    /// Stable model identity, including version.
    fn model_id(&self) -> &str;
}

/// Deterministic hash-derived embedder.
///
/// Maps each token to a pseudo-random direction derived from an FNV-1a
/// hash and sums them, so that texts sharing tokens land near each other.
/// No semantics, but fully reproducible, which is what tests and offline
/// fixtures need.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in fundrank_query::normalize::tokenize(text) {
            let mut state = fnv1a(token.as_bytes());
            for slot in vector.iter_mut() {
                // xorshift over the token hash fills the dimensions.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                *slot += ((state % 2048) as f32 / 1024.0) - 1.0;
            }
        }
        if vector.iter().all(|x| *x == 0.0) {
            // Empty text: a fixed direction keeps the vector valid.
            vector[0] = 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hash-embedder/1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(32);
        let a = block_on(embedder.embed("sbi technology fund")).unwrap();
        let b = block_on(embedder.embed("sbi technology fund")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_shared_tokens_increase_similarity() {
        let embedder = HashEmbedder::new(64);
        let base = block_on(embedder.embed("sbi technology fund")).unwrap();
        let related = block_on(embedder.embed("sbi technology growth")).unwrap();
        let unrelated = block_on(embedder.embed("government bond ladder")).unwrap();

        let cos = |a: &[f32], b: &[f32]| {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            dot / (na * nb)
        };
        assert!(cos(&base, &related) > cos(&base, &unrelated));
    }

    #[test]
    fn test_empty_text_still_valid() {
        let embedder = HashEmbedder::new(8);
        let v = block_on(embedder.embed("")).unwrap();
        assert!(v.iter().any(|x| *x != 0.0));
    }
}
