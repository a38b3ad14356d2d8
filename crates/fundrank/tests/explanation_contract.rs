//! The explanation record is a stable contract for UI consumers; its JSON
//! shape must not drift.

use fundrank::build::IndexBuilder;
use fundrank::config::EngineConfig;
use fundrank::corpus::CorpusStore;
use fundrank::embed::HashEmbedder;
use fundrank::engine::{SearchEngine, SearchOptions};
use fundrank::record::{FundRecord, RiskLevel};
use std::sync::Arc;

fn fund(id: &str, name: &str, house: &str, category: &str, risk: RiskLevel) -> FundRecord {
    FundRecord {
        fund_id: id.to_string(),
        fund_name: name.to_string(),
        fund_house: house.to_string(),
        category: category.to_string(),
        sub_category: None,
        asset_class: None,
        fund_type: None,
        sector: None,
        risk_level: Some(risk),
        expense_ratio: Some(0.6),
        return_1yr: Some(8.0),
        return_3yr: Some(7.1),
        return_5yr: None,
        aum: Some(3000.0),
        top_holdings: Vec::new(),
        sector_allocation: Vec::new(),
        description: String::new(),
    }
}

#[tokio::test]
async fn explanation_serializes_with_stable_fields() {
    let corpus = CorpusStore::from_records(vec![
        fund("F1", "SBI Magnum Gilt Fund", "SBI", "Debt", RiskLevel::Low),
        fund("F2", "SBI Savings Fund", "SBI", "Debt", RiskLevel::Low),
    ])
    .unwrap();
    let embedder = Arc::new(HashEmbedder::new(16));
    let generation = IndexBuilder::new(EngineConfig::default())
        .build(corpus, embedder.as_ref())
        .await
        .unwrap();
    let engine = SearchEngine::new(generation, embedder, EngineConfig::default()).unwrap();

    let hits = engine
        .search(
            "low risk sbi debt fund",
            SearchOptions {
                explain: true,
                ..SearchOptions::with_k(2).unwrap()
            },
        )
        .await
        .unwrap();

    let value = serde_json::to_value(&hits[0]).unwrap();
    let explanation = &value["explanation"];

    for key in [
        "semantic",
        "metadata",
        "fuzzy",
        "weights",
        "final_score",
        "components",
        "semantic_source",
    ] {
        assert!(
            explanation.get(key).is_some(),
            "explanation missing key {}",
            key
        );
    }
    assert!((explanation["weights"]["sem"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    assert!((explanation["weights"]["meta"].as_f64().unwrap() - 0.3).abs() < 1e-6);

    let components = explanation["components"].as_array().unwrap();
    assert_eq!(components.len(), 3);
    for component in components {
        assert!(component.get("constraint").is_some());
        assert!(component.get("weight").is_some());
        assert!(component.get("indicator").is_some());
    }

    // Subscores are reported at four-decimal precision.
    for key in ["semantic", "metadata", "fuzzy", "final_score"] {
        let score = explanation[key].as_f64().unwrap();
        let scaled = score * 10_000.0;
        assert!(
            (scaled - scaled.round()).abs() < 1e-3,
            "{} = {} not rounded to 4 decimals",
            key,
            score
        );
    }
}

#[tokio::test]
async fn explanation_absent_without_flag() {
    let corpus =
        CorpusStore::from_records(vec![fund("F1", "SBI Magnum Gilt Fund", "SBI", "Debt", RiskLevel::Low)])
            .unwrap();
    let embedder = Arc::new(HashEmbedder::new(16));
    let generation = IndexBuilder::new(EngineConfig::default())
        .build(corpus, embedder.as_ref())
        .await
        .unwrap();
    let engine = SearchEngine::new(generation, embedder, EngineConfig::default()).unwrap();

    let hits = engine
        .search("sbi debt", SearchOptions::with_k(1).unwrap())
        .await
        .unwrap();
    let value = serde_json::to_value(&hits[0]).unwrap();
    assert!(value.get("explanation").is_none());
}
