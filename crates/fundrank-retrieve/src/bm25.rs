//! BM25 retrieval module.
//!
//! Provides an in-memory inverted index with Okapi BM25 scoring for
//! first-stage lexical retrieval over fund descriptions.
//!
//! # BM25 Formula
//!
//! ```text
//! BM25(q, d) = Σ IDF(q_i) * (tf(q_i, d) * (k1 + 1)) / (tf(q_i, d) + k1 * (1 - b + b * |d|/avgdl))
//! ```
//!
//! Where:
//! - `tf(q_i, d)` = frequency of term q_i in document d
//! - `|d|` = length of document d, `avgdl` = average document length
//! - `k1` = term frequency saturation parameter
//! - `b` = length normalization parameter
//! - `IDF(q_i) = ln((N - df + 0.5) / (df + 0.5) + 1)`
//!
//! The `+ 1` inside the logarithm keeps IDF positive for very common terms,
//! which is the numerically stable BM25 variant.
//!
//! # Retrieval Policies
//!
//! - Tokenization is owned by the caller; the same normalizer output must be
//!   fed to both `add_document` and `retrieve`.
//! - An empty query, or a query with no matching terms, returns the empty
//!   set. This is a success, not an error.
//! - Ties are broken by ascending document id so results are deterministic
//!   across runs.

use std::collections::{HashMap, HashSet};

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation parameter (k1).
    /// Controls how quickly term frequency saturates.
    /// Default: 1.5
    pub k1: f32,

    /// Length normalization parameter (b).
    /// Controls the strength of length normalization.
    /// Default: 0.75
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Inverted index for BM25 retrieval.
///
/// Stores term-to-document mappings and document statistics. The index is
/// append-only during a build and read-only afterwards; all retrieval
/// methods take `&self` and are safe for concurrent readers.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// Term -> (Document ID -> Term Frequency)
    postings: HashMap<String, HashMap<u32, u32>>,

    /// Document ID -> Document Length (in terms)
    doc_lengths: HashMap<u32, u32>,

    /// Total number of documents
    num_docs: u32,

    /// Average document length
    avg_doc_length: f32,

    /// Document frequency for each term (for IDF calculation)
    doc_frequencies: HashMap<String, u32>,
}

impl InvertedIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the index.
    ///
    /// # Arguments
    ///
    /// * `doc_id` - Document identifier
    /// * `terms` - Tokenized document terms (normalizer output)
    pub fn add_document(&mut self, doc_id: u32, terms: &[String]) {
        let doc_length = terms.len() as u32;
        self.doc_lengths.insert(doc_id, doc_length);

        let mut term_freqs: HashMap<String, u32> = HashMap::new();
        for term in terms {
            *term_freqs.entry(term.clone()).or_insert(0) += 1;
        }

        for (term, freq) in term_freqs {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(doc_id, freq);

            *self.doc_frequencies.entry(term).or_insert(0) += 1;
        }

        self.num_docs += 1;
        self.update_avg_doc_length();
    }

    fn update_avg_doc_length(&mut self) {
        let total_length: u32 = self.doc_lengths.values().sum();
        if self.num_docs > 0 {
            self.avg_doc_length = total_length as f32 / self.num_docs as f32;
        }
    }

    /// Get the number of documents in the index.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Get the postings list (term -> document -> term frequency).
    pub fn postings(&self) -> &HashMap<String, HashMap<u32, u32>> {
        &self.postings
    }

    /// Get document lengths (document ID -> document length in terms).
    pub fn doc_lengths(&self) -> &HashMap<u32, u32> {
        &self.doc_lengths
    }

    /// Calculate inverse document frequency (IDF) for a term.
    ///
    /// Uses `ln((N - df + 0.5) / (df + 0.5) + 1)`. Terms absent from the
    /// index have IDF 0 and contribute nothing to scores.
    pub fn idf(&self, term: &str) -> f32 {
        let df = self.doc_frequencies.get(term).copied().unwrap_or(0) as f32;
        if df == 0.0 {
            return 0.0;
        }
        let n = self.num_docs as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score a document against a query using BM25.
    pub fn score(&self, doc_id: u32, query_terms: &[String], params: Bm25Params) -> f32 {
        let query_idfs: Vec<f32> = query_terms.iter().map(|t| self.idf(t)).collect();
        self.score_with_idfs(doc_id, query_terms, &query_idfs, params)
    }

    fn score_with_idfs(
        &self,
        doc_id: u32,
        query_terms: &[String],
        query_idfs: &[f32],
        params: Bm25Params,
    ) -> f32 {
        if self.avg_doc_length == 0.0 {
            return 0.0;
        }

        let doc_length = self.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f32;
        let mut score = 0.0;

        for (term, &idf) in query_terms.iter().zip(query_idfs.iter()) {
            if idf == 0.0 {
                continue;
            }

            let tf = self
                .postings
                .get(term)
                .and_then(|postings| postings.get(&doc_id))
                .copied()
                .unwrap_or(0) as f32;

            if tf == 0.0 {
                continue;
            }

            let numerator = tf * (params.k1 + 1.0);
            let denominator =
                tf + params.k1 * (1.0 - params.b + params.b * doc_length / self.avg_doc_length);
            score += idf * numerator / denominator;
        }

        score
    }

    /// Retrieve top-k documents for a query using BM25 scoring.
    ///
    /// Scores every document containing at least one query term and returns
    /// the top-k results sorted by score descending, ties broken by
    /// ascending document id.
    ///
    /// # Arguments
    ///
    /// * `query_terms` - Tokenized query terms (normalizer output)
    /// * `k` - Number of documents to retrieve
    /// * `params` - BM25 parameters (k1, b)
    ///
    /// # Returns
    ///
    /// Vector of `(document_id, score)` pairs. An empty or fully
    /// out-of-vocabulary query yields an empty vector.
    pub fn retrieve(
        &self,
        query_terms: &[String],
        k: usize,
        params: Bm25Params,
    ) -> Vec<(u32, f32)> {
        self.retrieve_filtered(query_terms, k, params, None)
    }

    /// Retrieve top-k documents, optionally restricted to an allowed pool.
    ///
    /// When `allow` is `Some`, only documents in the pool are scored. This
    /// is how the candidate generator runs lexical retrieval over a
    /// hard-filtered subset of the corpus.
    pub fn retrieve_filtered(
        &self,
        query_terms: &[String],
        k: usize,
        params: Bm25Params,
        allow: Option<&HashSet<u32>>,
    ) -> Vec<(u32, f32)> {
        if query_terms.is_empty() || self.num_docs == 0 || k == 0 {
            return Vec::new();
        }

        let query_idfs: Vec<f32> = query_terms.iter().map(|t| self.idf(t)).collect();

        // Candidate documents: any document containing at least one query term.
        let mut candidates: Vec<u32> = Vec::new();
        let mut seen: HashSet<u32> = HashSet::new();
        for term in query_terms {
            if let Some(postings) = self.postings.get(term) {
                for &doc_id in postings.keys() {
                    if let Some(pool) = allow {
                        if !pool.contains(&doc_id) {
                            continue;
                        }
                    }
                    if seen.insert(doc_id) {
                        candidates.push(doc_id);
                    }
                }
            }
        }

        let mut heap = TopK::new(k);
        for doc_id in candidates {
            let score = self.score_with_idfs(doc_id, query_terms, &query_idfs, params);
            if !score.is_finite() || score <= 0.0 {
                continue;
            }
            heap.push(doc_id, score);
        }

        heap.into_sorted()
    }
}

/// Bounded top-k collector with deterministic tie-breaking.
///
/// Keeps the k best `(id, score)` entries, preferring higher scores and,
/// among equal scores, lower ids.
pub(crate) struct TopK {
    k: usize,
    entries: std::collections::BinaryHeap<std::cmp::Reverse<Entry>>,
}

#[derive(PartialEq)]
struct Entry {
    score: f32,
    id: u32,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher score ranks higher; among equal scores, lower id ranks higher.
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            entries: std::collections::BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, id: u32, score: f32) {
        self.entries.push(std::cmp::Reverse(Entry { score, id }));
        if self.entries.len() > self.k {
            self.entries.pop();
        }
    }

    pub(crate) fn into_sorted(self) -> Vec<(u32, f32)> {
        let mut results: Vec<(u32, f32)> = self
            .entries
            .into_iter()
            .map(|std::cmp::Reverse(e)| (e.id, e.score))
            .collect();
        results.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        text.split_whitespace().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bm25_basic() {
        let mut index = InvertedIndex::new();
        index.add_document(0, &terms("sbi technology equity growth"));
        index.add_document(1, &terms("hdfc debt liquid short"));
        index.add_document(2, &terms("sbi technology sector thematic"));

        let query = terms("sbi technology");
        let results = index.retrieve(&query, 10, Bm25Params::default());

        assert!(results.len() >= 2);
        assert!(results.iter().any(|(_, score)| *score > 0.0));
        assert!(results.iter().all(|(id, _)| *id != 1));
    }

    #[test]
    fn test_empty_query_returns_empty_set() {
        let mut index = InvertedIndex::new();
        index.add_document(0, &terms("equity fund"));

        assert!(index.retrieve(&[], 10, Bm25Params::default()).is_empty());
        assert!(index
            .retrieve(&terms("zzz unknown"), 10, Bm25Params::default())
            .is_empty());
    }

    #[test]
    fn test_idf_ordering() {
        let mut index = InvertedIndex::new();
        index.add_document(0, &terms("common term"));
        index.add_document(1, &terms("common word"));
        index.add_document(2, &terms("rare term"));

        assert!(index.idf("rare") > index.idf("common"));
        assert_eq!(index.idf("absent"), 0.0);
    }

    #[test]
    fn test_tie_break_ascending_id() {
        let mut index = InvertedIndex::new();
        // Identical documents score identically; lower id must come first.
        index.add_document(7, &terms("equity growth"));
        index.add_document(3, &terms("equity growth"));
        index.add_document(5, &terms("equity growth"));

        let results = index.retrieve(&terms("equity"), 10, Bm25Params::default());
        let ids: Vec<u32> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn test_filtered_retrieval() {
        let mut index = InvertedIndex::new();
        for id in 0..6 {
            index.add_document(id, &terms("balanced hybrid fund"));
        }

        let pool: HashSet<u32> = [1, 4].into_iter().collect();
        let results =
            index.retrieve_filtered(&terms("hybrid"), 10, Bm25Params::default(), Some(&pool));
        let ids: Vec<u32> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_k_limits_results() {
        let mut index = InvertedIndex::new();
        for id in 0..20 {
            index.add_document(id, &terms("index fund passive"));
        }

        let results = index.retrieve(&terms("index"), 5, Bm25Params::default());
        assert_eq!(results.len(), 5);
    }
}
