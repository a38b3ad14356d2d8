//! Complete end-to-end search pipeline example.
//!
//! Demonstrates the full fundrank flow:
//! 1. Ingest a small fund catalog
//! 2. Build an index generation (BM25 + dense ANN)
//! 3. Run hybrid searches with explanations
//! 4. Build the advisor prompt from the top matches

use fundrank::prelude::*;
use fundrank::record::SectorWeight;
use std::sync::Arc;

fn fund(
    id: &str,
    name: &str,
    house: &str,
    category: &str,
    risk: RiskLevel,
    return_3yr: f32,
) -> FundRecord {
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
        expense_ratio: Some(0.9),
        return_1yr: Some(return_3yr + 2.0),
        return_3yr: Some(return_3yr),
        return_5yr: None,
        aum: Some(8000.0),
        top_holdings: vec!["Reliance".to_string(), "Infosys".to_string()],
        sector_allocation: vec![SectorWeight {
            sector: "Financial Services".to_string(),
            weight: 0.3,
        }],
        description: String::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== fundrank search pipeline ===\n");

    // 1. Ingest
    let corpus = CorpusStore::from_records(vec![
        fund("F001", "SBI Magnum Gilt Fund", "SBI", "Debt", RiskLevel::Low, 6.8),
        fund("F002", "SBI Bluechip Fund", "SBI", "Equity", RiskLevel::Moderate, 13.2),
        fund("F003", "HDFC Flexicap Fund", "HDFC", "Equity", RiskLevel::Moderate, 16.1),
        fund("F004", "Axis ELSS Tax Saver Fund", "Axis", "ELSS", RiskLevel::Moderate, 12.9),
    ])?;
    println!("Step 1: Ingested {} funds", corpus.len());

    // 2. Build a generation
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let config = EngineConfig::default();
    let generation = IndexBuilder::new(config.clone())
        .build(corpus, embedder.as_ref())
        .await?;
    println!("Step 2: Built index generation ({} vectors)\n", generation.len());

    let engine = SearchEngine::new(generation, embedder, config)?;

    // 3. Search with explanations
    let query = "low risk sbi debt fund";
    let hits = engine
        .search(
            query,
            SearchOptions {
                explain: true,
                ..SearchOptions::with_k(3)?
            },
        )
        .await?;
    println!("Step 3: Results for {:?}", query);
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} (final {:.4}, sem {:.4}, meta {:.4}, fuzz {:.4})",
            rank + 1,
            hit.fund_name,
            hit.final_score,
            hit.semantic_score,
            hit.metadata_score,
            hit.fuzzy_score
        );
        if let Some(explanation) = &hit.explanation {
            for component in &explanation.components {
                println!(
                    "       {} -> indicator {:.2} (weight {:.1})",
                    component.constraint, component.indicator, component.weight
                );
            }
        }
    }

    // 4. Advisor prompt
    let response = engine.explain_prompt(query).await?;
    println!("\nStep 4: Advisor prompt\n---\n{}\n---", response.prompt);

    Ok(())
}
