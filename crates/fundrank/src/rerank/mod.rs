//! Enhanced reranking: semantic, metadata and fuzzy subscores fused under
//! an explicit weight vector.
//!
//! For every candidate the reranker computes three normalized subscores in
//! [0, 1]:
//!
//! - **semantic**: `max(0, cosine(query, fund))`, computed on demand from
//!   the generation's vector store when the candidate came from the
//!   lexical side only
//! - **metadata**: a weighted average of per-field match indicators
//!   against the parsed constraints, with soft partial credit for numeric
//!   thresholds
//! - **fuzzy**: token-set similarity of the residual query against fund
//!   name and fund house
//!
//! `final = w_sem·sem + w_meta·meta + w_fuzz·fuzz`, sorted descending with
//! ties broken by metadata score, then ascending fund id. Each returned
//! candidate can carry a full [`Explanation`] with subscores at
//! four-decimal precision and the constraint-level contributions; the
//! explanation shape is a stable contract for UI consumers.

pub mod fuzzy;
pub mod soft;

use crate::candidates::Candidate;
use crate::config::EngineConfig;
use crate::generation::Generation;
use crate::record::FundRecord;
use fundrank_query::{Constraint, ParsedQuery};
use serde::Serialize;
use soft::{partial_credit, Direction};

/// Metadata indicator weights, per constraint family.
const W_AMC: f32 = 2.0;
const W_CATEGORY: f32 = 1.5;
const W_RISK: f32 = 1.2;
const W_SECTOR: f32 = 1.2;
const W_MIN_RETURN: f32 = 1.0;
const W_MAX_EXPENSE: f32 = 0.8;
const W_MIN_AUM: f32 = 0.8;

/// Indicator value for a sector present in the top-3 allocation but not
/// the primary sector, and for an adjacent risk tier.
const NEAR_MATCH_CREDIT: f32 = 0.5;

/// The final-score weight vector as applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub sem: f32,
    pub meta: f32,
    pub fuzz: f32,
}

/// Where the semantic subscore came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticSource {
    /// Cosine between the query embedding and the fund embedding.
    Cosine,
    /// No query embedding was available; the subscore defaulted to 0.
    Unavailable,
}

/// One constraint's contribution to the metadata subscore.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    /// Stable constraint field name (`amc`, `min_return_3yr`, ...).
    pub constraint: &'static str,
    /// Table weight for this constraint family.
    pub weight: f32,
    /// Match indicator in [0, 1].
    pub indicator: f32,
}

/// Stable explanation record for one scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Subscores at four-decimal precision.
    pub semantic: f32,
    pub metadata: f32,
    pub fuzzy: f32,
    pub weights: Weights,
    pub final_score: f32,
    pub components: Vec<ComponentScore>,
    pub semantic_source: SemanticSource,
}

/// A reranked candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub row: u32,
    pub fund_id: String,
    pub semantic: f32,
    pub metadata: f32,
    pub fuzzy: f32,
    /// Raw BM25 score carried through from candidate generation.
    pub bm25: f32,
    pub final_score: f32,
    pub explanation: Option<Explanation>,
}

/// Metadata subscore for one record against the parsed constraints.
///
/// Returns the weighted indicator average and the per-constraint
/// components. An empty constraint set scores 0; there is nothing to
/// reward.
pub fn metadata_score(
    record: &FundRecord,
    constraints: &[Constraint],
    band: f32,
) -> (f32, Vec<ComponentScore>) {
    if constraints.is_empty() {
        return (0.0, Vec::new());
    }

    let mut components = Vec::with_capacity(constraints.len());
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;

    for constraint in constraints {
        let (weight, indicator) = match constraint {
            Constraint::Amc(house) => (
                W_AMC,
                if record.fund_house.eq_ignore_ascii_case(house) {
                    1.0
                } else {
                    0.0
                },
            ),
            Constraint::Category(category) => (
                W_CATEGORY,
                if record.category.eq_ignore_ascii_case(category) {
                    1.0
                } else {
                    0.0
                },
            ),
            Constraint::RiskLevel(tier) => {
                let indicator = match &record.risk_level {
                    Some(level) if level.matches_tier(tier) => 1.0,
                    Some(level) if level.is_adjacent_tier(tier) => NEAR_MATCH_CREDIT,
                    _ => 0.0,
                };
                (W_RISK, indicator)
            }
            Constraint::Sector(sector) => {
                let exact = record
                    .sector
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(sector));
                let indicator = if exact {
                    1.0
                } else if record
                    .sector_allocation
                    .iter()
                    .take(3)
                    .any(|sw| sw.sector.eq_ignore_ascii_case(sector))
                {
                    NEAR_MATCH_CREDIT
                } else {
                    0.0
                };
                (W_SECTOR, indicator)
            }
            Constraint::MinReturn { period, pct } => {
                let indicator = record
                    .return_for(*period)
                    .map(|value| partial_credit(value, *pct, Direction::AtLeast, band))
                    .unwrap_or(0.0);
                (W_MIN_RETURN, indicator)
            }
            Constraint::MaxExpenseRatio(pct) => {
                let indicator = record
                    .expense_ratio
                    .map(|value| partial_credit(value, *pct, Direction::AtMost, band))
                    .unwrap_or(0.0);
                (W_MAX_EXPENSE, indicator)
            }
            Constraint::MinAum(threshold) => {
                let indicator = record
                    .aum
                    .map(|value| partial_credit(value, *threshold, Direction::AtLeast, band))
                    .unwrap_or(0.0);
                (W_MIN_AUM, indicator)
            }
        };

        components.push(ComponentScore {
            constraint: constraint.field_name(),
            weight,
            indicator,
        });
        weighted_sum += weight * indicator;
        weight_total += weight;
    }

    let score = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (score, components)
}

/// Rerank candidates and return the top `k`.
///
/// `query_vec`, when present, must already be unit-normalized.
pub fn rerank(
    generation: &Generation,
    parsed: &ParsedQuery,
    query_vec: Option<&[f32]>,
    candidates: Vec<Candidate>,
    k: usize,
    config: &EngineConfig,
    explain: bool,
) -> Vec<ScoredCandidate> {
    let weights = Weights {
        sem: config.w_sem,
        meta: config.w_meta,
        fuzz: config.w_fuzz,
    };

    let mut scored: Vec<ScoredCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(record) = generation.record_of_row(candidate.row) else {
            continue;
        };

        let (semantic, semantic_source) = match query_vec {
            Some(vector) => {
                let similarity = candidate
                    .similarity
                    .unwrap_or_else(|| generation.dense.similarity(vector, candidate.row));
                (similarity.max(0.0), SemanticSource::Cosine)
            }
            None => (0.0, SemanticSource::Unavailable),
        };

        let (metadata, components) =
            metadata_score(record, &parsed.constraints, config.partial_credit_band);

        let fuzzy = if parsed.residual.trim().is_empty() {
            0.0
        } else {
            fuzzy::token_set_ratio(&parsed.residual, &record.fund_name)
                .max(fuzzy::token_set_ratio(&parsed.residual, &record.fund_house))
        };

        let final_score = (weights.sem * semantic + weights.meta * metadata + weights.fuzz * fuzzy)
            .clamp(0.0, 1.0);

        let explanation = explain.then(|| Explanation {
            semantic: round4(semantic),
            metadata: round4(metadata),
            fuzzy: round4(fuzzy),
            weights,
            final_score: round4(final_score),
            components,
            semantic_source,
        });

        scored.push(ScoredCandidate {
            row: candidate.row,
            fund_id: record.fund_id.clone(),
            semantic,
            metadata,
            fuzzy,
            bm25: candidate.bm25,
            final_score,
            explanation,
        });
    }

    scored.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.metadata
                    .partial_cmp(&a.metadata)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.fund_id.cmp(&b.fund_id))
    });
    scored.truncate(k);
    scored
}

fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RiskLevel, SectorWeight};
    use fundrank_query::{ReturnPeriod, RiskTier};

    fn record() -> FundRecord {
        FundRecord {
            fund_id: "F1".to_string(),
            fund_name: "SBI Technology Fund".to_string(),
            fund_house: "SBI".to_string(),
            category: "Equity".to_string(),
            sub_category: None,
            asset_class: None,
            fund_type: None,
            sector: Some("Technology".to_string()),
            risk_level: Some(RiskLevel::High),
            expense_ratio: Some(1.1),
            return_1yr: Some(20.0),
            return_3yr: Some(14.0),
            return_5yr: None,
            aum: Some(5000.0),
            top_holdings: Vec::new(),
            sector_allocation: vec![SectorWeight {
                sector: "Financial Services".to_string(),
                weight: 0.1,
            }],
            description: String::new(),
        }
    }

    #[test]
    fn test_empty_constraints_score_zero() {
        let (score, components) = metadata_score(&record(), &[], 0.2);
        assert_eq!(score, 0.0);
        assert!(components.is_empty());
    }

    #[test]
    fn test_exact_matches_score_one() {
        let constraints = vec![
            Constraint::Amc("sbi".to_string()),
            Constraint::Category("EQUITY".to_string()),
            Constraint::Sector("Technology".to_string()),
            Constraint::RiskLevel(RiskTier::High),
        ];
        let (score, components) = metadata_score(&record(), &constraints, 0.2);
        assert!((score - 1.0).abs() < 1e-6);
        assert!(components.iter().all(|c| c.indicator == 1.0));
    }

    #[test]
    fn test_adjacent_risk_half_credit() {
        let constraints = vec![Constraint::RiskLevel(RiskTier::Moderate)];
        let (score, _) = metadata_score(&record(), &constraints, 0.2);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sector_allocation_half_credit() {
        let constraints = vec![Constraint::Sector("Financial Services".to_string())];
        let (score, _) = metadata_score(&record(), &constraints, 0.2);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_numeric_partial_credit_in_band() {
        // return_3yr = 14 against a threshold of 15: inside the 20% band.
        let constraints = vec![Constraint::MinReturn {
            period: ReturnPeriod::ThreeYear,
            pct: 15.0,
        }];
        let (score, components) = metadata_score(&record(), &constraints, 0.2);
        assert!((score - 14.0 / 15.0).abs() < 1e-6);
        assert_eq!(components[0].constraint, "min_return_3yr");
    }

    #[test]
    fn test_absent_numeric_scores_zero_not_one() {
        // return_5yr is absent; absence is never treated as satisfying.
        let constraints = vec![Constraint::MinReturn {
            period: ReturnPeriod::FiveYear,
            pct: 5.0,
        }];
        let (score, _) = metadata_score(&record(), &constraints, 0.2);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_weighted_average_uses_table_weights() {
        // amc (2.0) matches, min_return_3yr (1.0) fails entirely.
        let constraints = vec![
            Constraint::Amc("SBI".to_string()),
            Constraint::MinReturn {
                period: ReturnPeriod::ThreeYear,
                pct: 50.0,
            },
        ];
        let (score, _) = metadata_score(&record(), &constraints, 0.2);
        assert!((score - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
