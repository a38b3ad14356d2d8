//! Fuzzy string matching over normalizer tokens.
//!
//! Token-set similarity recovers misspellings and partial fund names
//! ("hdfc flexcap" vs "HDFC Flexicap Fund"). Both sides go through the
//! shared normalizer so there is exactly one tokenization in the system.

use fundrank_query::normalize::tokenize;
use std::collections::BTreeSet;

/// Normalized token-set ratio in [0, 1].
///
/// Both strings are reduced to unique normalizer tokens. Each query token
/// is aligned with its best-matching target token under normalized
/// Levenshtein similarity, and the alignment scores are averaged weighted
/// by token length, so a long misspelled token ("flexcap" vs "flexicap")
/// dominates a short exact one.
///
/// Properties:
/// - a query whose token set is a subset of the target's scores 1.0
///   (order and duplication never matter)
/// - an empty side scores 0.0
/// - single-character edits on one token degrade the score smoothly
pub fn token_set_ratio(query: &str, target: &str) -> f32 {
    let query_tokens: BTreeSet<String> = tokenize(query).into_iter().collect();
    let target_tokens: BTreeSet<String> = tokenize(target).into_iter().collect();
    if query_tokens.is_empty() || target_tokens.is_empty() {
        return 0.0;
    }

    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for token in &query_tokens {
        let best = target_tokens
            .iter()
            .map(|t| strsim::normalized_levenshtein(token, t) as f32)
            .fold(0.0f32, f32::max);
        let weight = token.chars().count() as f32;
        weighted_sum += best * weight;
        weight_total += weight;
    }

    if weight_total == 0.0 {
        0.0
    } else {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sets_score_one() {
        assert!((token_set_ratio("SBI Bluechip Fund", "fund bluechip SBI") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_subset_scores_one() {
        // Query tokens are a subset of the fund name tokens.
        let score = token_set_ratio("hdfc flexicap", "HDFC Flexicap Fund");
        assert!((score - 1.0).abs() < 1e-6, "subset score too low: {}", score);
    }

    #[test]
    fn test_misspelling_scores_high() {
        let score = token_set_ratio("hdfc flexcap", "HDFC Flexicap Fund");
        assert!(score >= 0.85, "misspelling score too low: {}", score);

        let unrelated = token_set_ratio("kotak liquid", "HDFC Flexicap Fund");
        assert!(unrelated < score);
        assert!(unrelated < 0.5);
    }

    #[test]
    fn test_single_token_misspelling() {
        let score = token_set_ratio("flexcap", "HDFC Flexicap Fund");
        assert!(score >= 0.85, "got {}", score);
    }

    #[test]
    fn test_empty_sides_score_zero() {
        assert_eq!(token_set_ratio("", "HDFC Flexicap Fund"), 0.0);
        assert_eq!(token_set_ratio("anything", ""), 0.0);
        assert_eq!(token_set_ratio("", ""), 0.0);
    }

    #[test]
    fn test_bounds() {
        for (a, b) in [
            ("sbi tech", "SBI Technology Fund"),
            ("random words here", "completely different text"),
            ("one", "one two three four five"),
        ] {
            let score = token_set_ratio(a, b);
            assert!((0.0..=1.0).contains(&score), "{} out of bounds", score);
        }
    }
}
