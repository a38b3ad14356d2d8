//! Domain-specialized retrieval engine for a mutual fund catalog.
//!
//! Given a free-form natural-language query ("low-risk SBI tech fund with
//! returns above 12%"), the engine returns a ranked list of fund records
//! with a transparent score breakdown and can format the top results into a
//! structured prompt for a downstream LLM advisor.
//!
//! # Pipeline
//!
//! ```text
//! query -> normalize -> parse -> (BM25 ∪ ANN over filtered pool) -> rerank -> top-k
//!                                                                      |
//!                                                              RAG prompt builder
//! ```
//!
//! - Query understanding lives in [`fundrank_query`]: one normalizer shared
//!   with indexing, plus ordered rule-based extractors that peel structured
//!   constraints off the query and leave a residual semantic query.
//! - Candidate generation ([`candidates`]) applies high-precision hard
//!   filters, then fans out BM25 and dense ANN lookups concurrently over
//!   the surviving pool and union-merges the results.
//! - The reranker ([`rerank`]) scores each candidate on three normalized
//!   components (semantic, metadata, fuzzy), fuses them under an explicit
//!   weight vector, and emits a per-candidate explanation.
//! - [`prompt::build_prompt`] formats the top three results into a fixed
//!   advisor prompt.
//!
//! # Generations
//!
//! The corpus and its indexes form an immutable [`generation::Generation`].
//! A rebuild constructs the next generation off to the side and swaps it in
//! atomically; in-flight requests keep the snapshot they started with, so a
//! request never observes a half-updated index.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fundrank::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let corpus = CorpusStore::from_records(fundrank::ingest::read_csv_path("funds.csv")?)?;
//! let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
//! let config = EngineConfig::default();
//!
//! let generation = IndexBuilder::new(config.clone())
//!     .build(corpus, embedder.as_ref())
//!     .await?;
//! let engine = SearchEngine::new(generation, embedder, config)?;
//!
//! let hits = engine
//!     .search("low risk SBI debt fund", SearchOptions::with_k(3)?)
//!     .await?;
//! for hit in &hits {
//!     println!("{} {:.4}", hit.fund_name, hit.final_score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod candidates;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod prompt;
pub mod record;
pub mod rerank;

pub use error::{BuildError, EmbedError, SearchError};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::build::IndexBuilder;
    pub use crate::config::EngineConfig;
    pub use crate::corpus::CorpusStore;
    pub use crate::embed::{Embedder, HashEmbedder};
    pub use crate::engine::{SearchEngine, SearchHit, SearchOptions};
    pub use crate::error::{BuildError, EmbedError, SearchError};
    pub use crate::prompt::PromptResponse;
    pub use crate::record::{FundRecord, RiskLevel};
    pub use fundrank_query::{Constraint, ParsedQuery, QueryParser};
}
