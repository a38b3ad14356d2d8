//! Property-based tests for retrieval invariants.

use fundrank_retrieve::bm25::{Bm25Params, InvertedIndex};
use fundrank_retrieve::dense::DenseIndex;
use proptest::prelude::*;

fn doc_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec![
            "equity", "debt", "hybrid", "growth", "value", "index", "liquid", "sector",
            "technology", "pharma", "banking", "fund",
        ]),
        1..20,
    )
    .prop_map(|terms| terms.into_iter().map(|t| t.to_string()).collect())
}

proptest! {
    #[test]
    fn bm25_results_bounded_sorted_and_positive(
        docs in prop::collection::vec(doc_strategy(), 1..40),
        query in doc_strategy(),
        k in 1usize..20,
    ) {
        let mut index = InvertedIndex::new();
        for (i, doc) in docs.iter().enumerate() {
            index.add_document(i as u32, doc);
        }

        let results = index.retrieve(&query, k, Bm25Params::default());

        prop_assert!(results.len() <= k);
        for (_, score) in &results {
            prop_assert!(score.is_finite());
            prop_assert!(*score > 0.0);
        }
        for window in results.windows(2) {
            let (id_a, score_a) = window[0];
            let (id_b, score_b) = window[1];
            prop_assert!(score_a > score_b || (score_a == score_b && id_a < id_b));
        }
    }

    #[test]
    fn bm25_is_deterministic(
        docs in prop::collection::vec(doc_strategy(), 1..30),
        query in doc_strategy(),
    ) {
        let mut index = InvertedIndex::new();
        for (i, doc) in docs.iter().enumerate() {
            index.add_document(i as u32, doc);
        }
        prop_assert_eq!(
            index.retrieve(&query, 10, Bm25Params::default()),
            index.retrieve(&query, 10, Bm25Params::default())
        );
    }

    #[test]
    fn dense_similarities_stay_in_unit_interval(
        vectors in prop::collection::vec(
            prop::collection::vec(-10.0f32..10.0, 4..=4)
                .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3)),
            1..30,
        ),
        query in prop::collection::vec(-10.0f32..10.0, 4..=4)
            .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3)),
        k in 1usize..10,
    ) {
        let mut index = DenseIndex::new(4).unwrap();
        for v in &vectors {
            index.add(v).unwrap();
        }

        let results = index.retrieve(&query, k).unwrap();
        prop_assert!(results.len() <= k);
        for (_, sim) in &results {
            prop_assert!(*sim >= -1.0 - 1e-5 && *sim <= 1.0 + 1e-5);
        }
        for window in results.windows(2) {
            prop_assert!(window[0].1 >= window[1].1);
        }
    }
}
