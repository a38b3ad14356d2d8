//! Candidate generation: hard filters plus hybrid retrieval fan-out.
//!
//! Procedure per request:
//!
//! 1. Apply the high-precision hard filters (fund house, category, sector
//!    equality) to the corpus, producing the candidate pool P.
//! 2. If P is small (`small_pool_threshold`), skip index lookups entirely;
//!    every member of P goes to the reranker.
//! 3. Otherwise issue the BM25 and dense lookups concurrently over P and
//!    union-merge their results, attaching raw scores from whichever side
//!    produced each row.
//!
//! An empty residual with non-empty filters yields P itself (the reranker
//! scores it on metadata alone); an entirely empty parse yields nothing.

use crate::config::EngineConfig;
use crate::error::SearchError;
use crate::generation::Generation;
use fundrank_query::normalize::index_tokens;
use fundrank_query::{Constraint, ParsedQuery};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A retrieval candidate before reranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row: u32,
    /// Raw BM25 score; 0.0 when the row came from the dense side only.
    pub bm25: f32,
    /// Raw inner-product similarity when the dense side produced the row.
    pub similarity: Option<f32>,
}

/// Rows passing every hard filter, or `None` when no hard filter applies.
pub fn hard_filter_pool(generation: &Generation, parsed: &ParsedQuery) -> Option<HashSet<u32>> {
    let mut filters: Vec<&Constraint> = parsed
        .constraints
        .iter()
        .filter(|c| {
            matches!(
                c,
                Constraint::Amc(_) | Constraint::Category(_) | Constraint::Sector(_)
            )
        })
        .collect();
    if filters.is_empty() {
        return None;
    }
    filters.dedup();

    let mut pool = HashSet::new();
    for (row, fund_id) in generation.fund_ids.iter().enumerate() {
        let Some(record) = generation.corpus.get(fund_id) else {
            continue;
        };
        let passes = filters.iter().all(|constraint| match constraint {
            Constraint::Amc(house) => record.fund_house.eq_ignore_ascii_case(house),
            Constraint::Category(category) => record.category.eq_ignore_ascii_case(category),
            Constraint::Sector(sector) => record
                .sector
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(sector)),
            _ => true,
        });
        if passes {
            pool.insert(row as u32);
        }
    }
    Some(pool)
}

/// Generate candidates for a parsed query.
///
/// `query_vec` is the embedded residual, absent for lexical-only requests
/// or an empty residual.
pub async fn generate(
    generation: &Arc<Generation>,
    parsed: &ParsedQuery,
    query_vec: Option<Arc<Vec<f32>>>,
    k: usize,
    config: &EngineConfig,
) -> Result<Vec<Candidate>, SearchError> {
    if parsed.is_empty() {
        return Ok(Vec::new());
    }

    let pool = hard_filter_pool(generation, parsed);
    let pool_rows: Vec<u32> = match &pool {
        Some(set) => {
            let mut rows: Vec<u32> = set.iter().copied().collect();
            rows.sort_unstable();
            rows
        }
        None => (0..generation.len() as u32).collect(),
    };
    debug!(pool = pool_rows.len(), "hard-filtered candidate pool");

    let bm25_terms = index_tokens(&parsed.residual);

    // Small pool, or nothing to rank with: the whole pool is the candidate
    // set and ranking is left to the reranker.
    if pool_rows.len() <= config.small_pool_threshold
        || (bm25_terms.is_empty() && query_vec.is_none())
    {
        return Ok(pool_rows
            .into_iter()
            .map(|row| Candidate {
                row,
                bm25: 0.0,
                similarity: None,
            })
            .collect());
    }

    let k_bm25 = config.bm25_breadth(k);
    let k_ann = config.ann_breadth(k);
    let allow = pool.map(Arc::new);

    // The two lookups are CPU-bound over shared-immutable indexes; fan
    // them out so neither waits on the other.
    let lexical = {
        let generation = Arc::clone(generation);
        let allow = allow.clone();
        let terms = bm25_terms.clone();
        tokio::task::spawn_blocking(move || {
            if terms.is_empty() {
                return Vec::new();
            }
            generation.bm25.retrieve_filtered(
                &terms,
                k_bm25,
                generation.bm25_params,
                allow.as_deref(),
            )
        })
    };
    let semantic = {
        let generation = Arc::clone(generation);
        let allow = allow.clone();
        let query_vec = query_vec.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<(u32, f32)>, SearchError> {
            let Some(query_vec) = query_vec else {
                return Ok(Vec::new());
            };
            let results = match allow.as_deref() {
                // A hard-filtered pool is scanned exactly; the ANN graph
                // only serves unfiltered full-corpus recall.
                Some(pool) => generation
                    .dense
                    .retrieve_filtered(&query_vec, k_ann, Some(pool))?,
                None => generation
                    .graph
                    .search(&generation.dense, &query_vec, k_ann, k_ann)?,
            };
            Ok(results)
        })
    };

    let (lexical, semantic) = tokio::join!(lexical, semantic);
    let lexical = lexical.expect("bm25 lookup task panicked");
    let semantic = semantic.expect("dense lookup task panicked")?;

    let mut merged: HashMap<u32, Candidate> = HashMap::new();
    for (row, score) in lexical {
        merged.insert(
            row,
            Candidate {
                row,
                bm25: score,
                similarity: None,
            },
        );
    }
    for (row, similarity) in semantic {
        merged
            .entry(row)
            .or_insert(Candidate {
                row,
                bm25: 0.0,
                similarity: None,
            })
            .similarity = Some(similarity);
    }

    let mut candidates: Vec<Candidate> = merged.into_values().collect();
    candidates.sort_unstable_by_key(|c| c.row);
    debug!(candidates = candidates.len(), "union-merged candidates");
    Ok(candidates)
}
