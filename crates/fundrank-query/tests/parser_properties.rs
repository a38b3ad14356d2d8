//! Property-based tests for the query parser.

use fundrank_query::{parse, QueryParser};
use proptest::prelude::*;

fn query_strategy() -> impl Strategy<Value = String> {
    let word = prop::sample::select(vec![
        "sbi", "hdfc", "icici", "axis", "kotak", "low", "risk", "safe", "moderate", "aggressive",
        "debt", "equity", "hybrid", "liquid", "tax", "saver", "tech", "pharma", "banking", "fund",
        "returns", "above", "expense", "ratio", "under", "aum", "over", "retirement", "growth",
        "12", "15%", "1.5%", "500", "crore", "3", "year", "term", "long",
    ]);
    prop::collection::vec(word, 0..10).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn parsing_is_idempotent(query in query_strategy()) {
        let first = parse(&query);
        let second = parse(&first.render());

        prop_assert_eq!(&first.constraints, &second.constraints);
        prop_assert_eq!(&first.tags, &second.tags);
        prop_assert_eq!(&first.residual, &second.residual);
    }

    #[test]
    fn parser_never_panics_and_residual_is_normalized(query in "\\PC{0,60}") {
        let parser = QueryParser::new();
        let parsed = parser.parse(&query);

        // The residual is whitespace-collapsed normalizer output.
        prop_assert_eq!(
            parsed.residual.split_whitespace().collect::<Vec<_>>().join(" "),
            parsed.residual.clone()
        );
    }

    #[test]
    fn numeric_constraints_stay_in_sane_ranges(query in query_strategy()) {
        let parsed = parse(&query);
        for constraint in &parsed.constraints {
            match constraint {
                fundrank_query::Constraint::MinReturn { pct, .. } => {
                    prop_assert!((0.0..=100.0).contains(pct));
                }
                fundrank_query::Constraint::MaxExpenseRatio(pct) => {
                    prop_assert!((0.0..=100.0).contains(pct));
                }
                fundrank_query::Constraint::MinAum(value) => {
                    prop_assert!(*value >= 0.0);
                }
                _ => {}
            }
        }
    }
}
