//! The search engine: request/response surface over one active generation.
//!
//! A request pins the current generation once, parses the query, embeds
//! the residual, fans out candidate generation and reranks, all against
//! that single snapshot. Output is deterministic for a fixed (query,
//! generation, embedding model version, configuration).
//!
//! Each request may carry a deadline. When it elapses, in-flight embedding
//! and index lookups are abandoned and the caller gets
//! [`SearchError::DeadlineExceeded`]; shared indexes are never touched by
//! request failures.

use crate::build::IndexBuilder;
use crate::candidates;
use crate::config::EngineConfig;
use crate::corpus::CorpusStore;
use crate::embed::Embedder;
use crate::error::{BuildError, SearchError};
use crate::generation::{Generation, GenerationHandle};
use crate::prompt::{build_prompt, PromptResponse, PROMPT_SLOTS};
use crate::record::RiskLevel;
use crate::rerank::{self, Explanation, ScoredCandidate};
use fundrank_query::{Constraint, ParsedQuery, QueryParser};
use fundrank_retrieve::dense::DenseIndex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Per-request options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Requested result count, in [1, 100].
    pub k: usize,
    /// Attach full explanation records to each hit.
    pub explain: bool,
    /// Extra constraints applied on top of whatever the parser extracts.
    pub overrides: Vec<Constraint>,
    /// Wall-clock budget for the request.
    pub deadline: Option<Duration>,
    /// Skip embedding and run lexical retrieval only. This is the only
    /// path on which an embedding failure is not surfaced to the caller.
    pub lexical_only: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: 10,
            explain: false,
            overrides: Vec::new(),
            deadline: None,
            lexical_only: false,
        }
    }
}

impl SearchOptions {
    /// Options with a validated k and defaults elsewhere.
    pub fn with_k(k: usize) -> Result<Self, SearchError> {
        if !(1..=100).contains(&k) {
            return Err(SearchError::InvalidK(k));
        }
        Ok(Self {
            k,
            ..Self::default()
        })
    }
}

/// One search result row.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_house: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub final_score: f32,
    pub semantic_score: f32,
    pub metadata_score: f32,
    pub fuzzy_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

/// Domain-specialized retrieval engine over a fund catalog.
///
/// Cheap to share: all state is behind `Arc`s, and concurrent searches
/// proceed without per-request locks against the indexes.
pub struct SearchEngine {
    handle: GenerationHandle,
    embedder: Arc<dyn Embedder>,
    parser: QueryParser,
    config: EngineConfig,
}

impl SearchEngine {
    /// Create an engine over an initial generation.
    ///
    /// # Errors
    ///
    /// Rejects configurations whose score weights do not sum to 1.0 or
    /// whose tunables are out of range.
    pub fn new(
        generation: Generation,
        embedder: Arc<dyn Embedder>,
        config: EngineConfig,
    ) -> Result<Self, SearchError> {
        config.validate().map_err(SearchError::InvalidConfig)?;
        Ok(Self {
            handle: GenerationHandle::new(generation),
            embedder,
            parser: QueryParser::new(),
            config,
        })
    }

    /// The generation handle, for tests and operational tooling.
    pub fn handle(&self) -> &GenerationHandle {
        &self.handle
    }

    /// Rebuild the index from a new corpus and swap it in atomically.
    ///
    /// In-flight requests finish against the generation they pinned; a
    /// failed rebuild leaves the active generation untouched.
    pub async fn rebuild(&self, corpus: CorpusStore) -> Result<(), BuildError> {
        let next = IndexBuilder::new(self.config.clone())
            .build(corpus, self.embedder.as_ref())
            .await?;
        info!(funds = next.len(), "swapping in new generation");
        self.handle.swap(next);
        Ok(())
    }

    /// Search the catalog.
    ///
    /// Returns at most `k` hits sorted by final score descending (ties:
    /// metadata score descending, then fund id ascending). Zero hits is a
    /// success.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let (generation, scored) = self.search_scored(query, &options).await?;
        Ok(scored
            .into_iter()
            .filter_map(|candidate| {
                let record = generation.record_of_row(candidate.row)?;
                Some(SearchHit {
                    fund_id: record.fund_id.clone(),
                    fund_name: record.fund_name.clone(),
                    fund_house: record.fund_house.clone(),
                    category: record.category.clone(),
                    sub_category: record.sub_category.clone(),
                    risk_level: record.risk_level,
                    final_score: candidate.final_score,
                    semantic_score: candidate.semantic,
                    metadata_score: candidate.metadata,
                    fuzzy_score: candidate.fuzzy,
                    explanation: candidate.explanation,
                })
            })
            .collect())
    }

    /// Build the advisor prompt from the top three matches.
    pub async fn explain_prompt(&self, query: &str) -> Result<PromptResponse, SearchError> {
        let options = SearchOptions {
            k: PROMPT_SLOTS,
            ..SearchOptions::default()
        };
        let (generation, scored) = self.search_scored(query, &options).await?;

        let records: Vec<&crate::record::FundRecord> = scored
            .iter()
            .filter_map(|candidate| generation.record_of_row(candidate.row))
            .collect();
        let prompt = build_prompt(query, &records);
        Ok(PromptResponse {
            prompt,
            candidates: records.into_iter().cloned().collect(),
        })
    }

    async fn search_scored(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<(Arc<Generation>, Vec<ScoredCandidate>), SearchError> {
        if !(1..=100).contains(&options.k) {
            return Err(SearchError::InvalidK(options.k));
        }

        // Pin the generation before anything else: every sub-lookup of
        // this request sees the same snapshot (swap atomicity).
        let generation = self.handle.current();

        let mut parsed = self.parser.parse(query);
        parsed.constraints.extend(options.overrides.iter().cloned());
        debug!(
            residual = %parsed.residual,
            constraints = parsed.constraints.len(),
            warnings = parsed.warnings.len(),
            "parsed query"
        );

        if parsed.is_empty() {
            return Ok((generation, Vec::new()));
        }

        let work = self.retrieve_and_rank(&generation, &parsed, options);
        let scored = match options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, work)
                .await
                .map_err(|_| SearchError::DeadlineExceeded)??,
            None => work.await?,
        };
        Ok((generation, scored))
    }

    async fn retrieve_and_rank(
        &self,
        generation: &Arc<Generation>,
        parsed: &ParsedQuery,
        options: &SearchOptions,
    ) -> Result<Vec<ScoredCandidate>, SearchError> {
        let query_vec = if options.lexical_only || parsed.residual.trim().is_empty() {
            None
        } else {
            let raw = self.embedder.embed(&parsed.residual).await?;
            let normalized = DenseIndex::normalize(&raw).ok_or_else(|| {
                SearchError::Embedding(crate::error::EmbedError::new(
                    "embedding provider returned a zero or non-finite vector",
                ))
            })?;
            Some(Arc::new(normalized))
        };

        let candidates = candidates::generate(
            generation,
            parsed,
            query_vec.clone(),
            options.k,
            &self.config,
        )
        .await?;

        Ok(rerank::rerank(
            generation,
            parsed,
            query_vec.as_deref().map(|v| v.as_slice()),
            candidates,
            options.k,
            &self.config,
            options.explain,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::record::FundRecord;

    fn record(id: &str, name: &str, house: &str, category: &str) -> FundRecord {
        FundRecord {
            fund_id: id.to_string(),
            fund_name: name.to_string(),
            fund_house: house.to_string(),
            category: category.to_string(),
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
        }
    }

    async fn engine() -> SearchEngine {
        let corpus = CorpusStore::from_records(vec![
            record("F1", "SBI Bluechip Fund", "SBI", "Equity"),
            record("F2", "HDFC Liquid Fund", "HDFC", "Liquid"),
        ])
        .unwrap();
        let embedder = Arc::new(HashEmbedder::new(16));
        let generation = IndexBuilder::new(EngineConfig::default())
            .build(corpus, embedder.as_ref())
            .await
            .unwrap();
        SearchEngine::new(generation, embedder, EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_k_rejected() {
        let engine = engine().await;
        for k in [0usize, 101] {
            let result = engine
                .search("sbi", SearchOptions { k, ..SearchOptions::default() })
                .await;
            assert!(matches!(result, Err(SearchError::InvalidK(_))));
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_success() {
        let engine = engine().await;
        let hits = engine.search("", SearchOptions::with_k(5).unwrap()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let corpus = CorpusStore::from_records(vec![record("F1", "A", "SBI", "Debt")]).unwrap();
        let embedder = Arc::new(HashEmbedder::new(8));
        let generation = IndexBuilder::new(EngineConfig::default())
            .build(corpus, embedder.as_ref())
            .await
            .unwrap();
        let bad = EngineConfig {
            w_sem: 0.9,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SearchEngine::new(generation, embedder, bad),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
