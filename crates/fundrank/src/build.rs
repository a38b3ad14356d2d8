//! Index generation builder.
//!
//! Turns a corpus into a complete [`Generation`]: description tokens into
//! the BM25 index, embedded descriptions into the dense index and its ANN
//! graph, and the fund id mapping recorded in both directions. Optionally
//! saves and restores the whole set as on-disk artifacts.

use crate::config::EngineConfig;
use crate::corpus::CorpusStore;
use crate::embed::Embedder;
use crate::error::BuildError;
use crate::generation::Generation;
use fundrank_query::normalize::index_tokens;
use fundrank_retrieve::bm25::{Bm25Params, InvertedIndex};
use fundrank_retrieve::dense::hnsw::{HnswGraph, HnswParams};
use fundrank_retrieve::dense::DenseIndex;
use fundrank_retrieve::persistence::{self, Manifest};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Builds index generations from a corpus and an embedding provider.
pub struct IndexBuilder {
    config: EngineConfig,
    hnsw_params: HnswParams,
}

impl IndexBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            hnsw_params: HnswParams::default(),
        }
    }

    /// Override ANN construction parameters.
    pub fn with_hnsw_params(mut self, params: HnswParams) -> Self {
        self.hnsw_params = params;
        self
    }

    /// Build a new generation.
    ///
    /// Fatal on any malformed input, duplicate id, embedding failure or
    /// dimension mismatch; the caller's previous generation is unaffected.
    pub async fn build(
        &self,
        corpus: CorpusStore,
        embedder: &dyn Embedder,
    ) -> Result<Generation, BuildError> {
        let dimension = match self.config.embedding_dim {
            Some(dim) if dim != embedder.dimension() => {
                return Err(BuildError::DimensionMismatch {
                    expected: dim,
                    actual: embedder.dimension(),
                });
            }
            Some(dim) => dim,
            None => embedder.dimension(),
        };

        let bm25_params = Bm25Params {
            k1: self.config.k1,
            b: self.config.b,
        };
        let mut bm25 = InvertedIndex::new();
        let mut dense = DenseIndex::new(dimension)?;
        let mut fund_ids: Vec<String> = Vec::with_capacity(corpus.len());
        let mut rows: HashMap<String, u32> = HashMap::with_capacity(corpus.len());

        for record in corpus.iter_ordered() {
            let row = fund_ids.len() as u32;

            // Index the description plus the searchable metadata fields.
            let mut indexed_text = record.description.clone();
            for field in [
                Some(record.fund_name.as_str()),
                Some(record.fund_house.as_str()),
                Some(record.category.as_str()),
                record.sub_category.as_deref(),
                record.sector.as_deref(),
                record.risk_level.map(|r| r.as_str()),
            ]
            .into_iter()
            .flatten()
            {
                indexed_text.push(' ');
                indexed_text.push_str(field);
            }
            bm25.add_document(row, &index_tokens(&indexed_text));

            let vector = embedder.embed(&record.description).await?;
            if vector.len() != dimension {
                return Err(BuildError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            let dense_row = dense.add(&vector)?;
            debug_assert_eq!(dense_row, row);

            rows.insert(record.fund_id.clone(), row);
            fund_ids.push(record.fund_id.clone());
        }

        debug!(funds = fund_ids.len(), dimension, "building ANN graph");
        let graph = HnswGraph::build(&dense, self.hnsw_params.clone())?;

        let manifest = Manifest {
            embedding_model: embedder.model_id().to_string(),
            embedding_dim: dimension,
            corpus_checksum: corpus.checksum(),
            built_at: chrono::Utc::now().to_rfc3339(),
        };
        info!(
            funds = fund_ids.len(),
            model = %manifest.embedding_model,
            "index generation built"
        );

        Ok(Generation {
            corpus,
            bm25,
            bm25_params,
            dense,
            graph,
            fund_ids,
            rows,
            manifest,
        })
    }
}

/// Save a generation's index artifacts into a directory.
pub fn save_artifacts(generation: &Generation, dir: &Path) -> Result<(), BuildError> {
    let mapping: BTreeMap<String, u32> = generation
        .rows
        .iter()
        .map(|(id, &row)| (id.clone(), row))
        .collect();
    persistence::save_all(
        dir,
        &generation.dense,
        &generation.graph,
        &generation.bm25,
        generation.bm25_params,
        &mapping,
        &generation.manifest,
    )?;
    Ok(())
}

/// Restore a generation from saved artifacts plus the live corpus.
///
/// Validates that the manifest matches the corpus and, when configured,
/// the expected embedding identity.
pub fn load_artifacts(
    dir: &Path,
    corpus: CorpusStore,
    expected_model: Option<&str>,
) -> Result<Generation, BuildError> {
    let artifacts = persistence::load_all(dir)?;

    let checksum = corpus.checksum();
    if artifacts.manifest.corpus_checksum != checksum {
        return Err(BuildError::ManifestMismatch {
            field: "corpus_checksum",
            expected: artifacts.manifest.corpus_checksum.clone(),
            actual: checksum,
        });
    }
    if let Some(model) = expected_model {
        if artifacts.manifest.embedding_model != model {
            return Err(BuildError::ManifestMismatch {
                field: "embedding_model",
                expected: model.to_string(),
                actual: artifacts.manifest.embedding_model.clone(),
            });
        }
    }

    let mut fund_ids: Vec<String> = vec![String::new(); artifacts.mapping.len()];
    let mut rows: HashMap<String, u32> = HashMap::with_capacity(artifacts.mapping.len());
    for (fund_id, row) in &artifacts.mapping {
        if corpus.get(fund_id).is_none() {
            return Err(BuildError::ManifestMismatch {
                field: "mapping",
                expected: "fund id present in corpus".to_string(),
                actual: fund_id.clone(),
            });
        }
        if (*row as usize) >= fund_ids.len() {
            return Err(BuildError::ManifestMismatch {
                field: "mapping",
                expected: format!("row below {}", fund_ids.len()),
                actual: row.to_string(),
            });
        }
        fund_ids[*row as usize] = fund_id.clone();
        rows.insert(fund_id.clone(), *row);
    }

    Ok(Generation {
        corpus,
        bm25: artifacts.bm25,
        bm25_params: artifacts.bm25_params,
        dense: artifacts.dense,
        graph: artifacts.graph,
        fund_ids,
        rows,
        manifest: artifacts.manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::record::FundRecord;

    fn record(id: &str, name: &str, house: &str) -> FundRecord {
        FundRecord {
            fund_id: id.to_string(),
            fund_name: name.to_string(),
            fund_house: house.to_string(),
            category: "Equity".to_string(),
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

    fn corpus() -> CorpusStore {
        CorpusStore::from_records(vec![
            record("F1", "SBI Bluechip Fund", "SBI"),
            record("F2", "HDFC Flexicap Fund", "HDFC"),
            record("F3", "Axis Midcap Fund", "Axis"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_wires_all_indexes() {
        let generation = IndexBuilder::new(EngineConfig::default())
            .build(corpus(), &HashEmbedder::new(16))
            .await
            .unwrap();

        assert_eq!(generation.len(), 3);
        assert_eq!(generation.dense.len(), 3);
        assert_eq!(generation.graph.len(), 3);
        assert_eq!(generation.bm25.num_docs(), 3);
        assert_eq!(generation.row_of("F2"), Some(1));
        assert_eq!(generation.record_of_row(1).unwrap().fund_house, "HDFC");
        assert_eq!(generation.manifest.embedding_dim, 16);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let config = EngineConfig {
            embedding_dim: Some(32),
            ..EngineConfig::default()
        };
        let result = IndexBuilder::new(config)
            .build(corpus(), &HashEmbedder::new(16))
            .await;
        assert!(matches!(
            result,
            Err(BuildError::DimensionMismatch {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[tokio::test]
    async fn test_artifact_roundtrip() {
        let generation = IndexBuilder::new(EngineConfig::default())
            .build(corpus(), &HashEmbedder::new(16))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        save_artifacts(&generation, dir.path()).unwrap();

        let restored = load_artifacts(dir.path(), corpus(), Some("hash-embedder/1")).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.row_of("F3"), generation.row_of("F3"));
        assert_eq!(restored.manifest, generation.manifest);
    }

    #[tokio::test]
    async fn test_manifest_mismatch_on_changed_corpus() {
        let generation = IndexBuilder::new(EngineConfig::default())
            .build(corpus(), &HashEmbedder::new(16))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        save_artifacts(&generation, dir.path()).unwrap();

        let changed = CorpusStore::from_records(vec![
            record("F1", "SBI Bluechip Fund", "SBI"),
            record("F2", "Renamed Fund", "HDFC"),
            record("F3", "Axis Midcap Fund", "Axis"),
        ])
        .unwrap();

        assert!(matches!(
            load_artifacts(dir.path(), changed, None),
            Err(BuildError::ManifestMismatch {
                field: "corpus_checksum",
                ..
            })
        ));
    }
}
