//! Disk persistence for index artifacts.
//!
//! An index build emits four files with a stable layout, plus a sidecar
//! manifest:
//!
//! - `vectors.bin`: embedding matrix: framed header (magic `FNDV`, format
//!   version, count, dim) followed by row-major little-endian f32 data and
//!   a trailing CRC32 of the payload
//! - `graph.bin`: the HNSW graph: framed header (magic `FNDG`, format
//!   version, payload length) around a postcard payload, trailing CRC32
//! - `bm25.json`: the full BM25 state (postings, document lengths, k1, b)
//!   as a single JSON blob
//! - `mapping.json`: sorted `fund_id -> row` map
//! - `manifest.json`: embedding model identity and version, embedding
//!   dimension, corpus checksum, build timestamp
//!
//! Loading validates magic bytes, format version and checksums, and that
//! the vector count equals the mapping size. Any mismatch is fatal.

use crate::bm25::{Bm25Params, InvertedIndex};
use crate::dense::hnsw::HnswGraph;
use crate::dense::DenseIndex;
use crate::error::{PersistenceError, PersistenceResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes for the vector array artifact.
pub const VECTORS_MAGIC: [u8; 4] = *b"FNDV";

/// Magic bytes for the ANN graph artifact.
pub const GRAPH_MAGIC: [u8; 4] = *b"FNDG";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Artifact file names within an index directory.
pub const VECTORS_FILE: &str = "vectors.bin";
pub const GRAPH_FILE: &str = "graph.bin";
pub const BM25_FILE: &str = "bm25.json";
pub const MAPPING_FILE: &str = "mapping.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Build manifest recorded next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Embedding model identity (provider id, includes version).
    pub embedding_model: String,
    /// Expected embedding dimension.
    pub embedding_dim: usize,
    /// CRC32 checksum of the source corpus, hex-encoded.
    pub corpus_checksum: String,
    /// Build timestamp, RFC 3339.
    pub built_at: String,
}

/// Serializable BM25 state.
///
/// `BTreeMap` keys keep the JSON output sorted and stable across builds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Bm25State {
    pub k1: f32,
    pub b: f32,
    /// term -> (doc id -> term frequency)
    pub postings: BTreeMap<String, BTreeMap<u32, u32>>,
    /// doc id -> document length
    pub doc_lengths: BTreeMap<u32, u32>,
}

impl Bm25State {
    /// Capture the state of an index alongside its tuning parameters.
    pub fn from_index(index: &InvertedIndex, params: Bm25Params) -> Self {
        let postings = index
            .postings()
            .iter()
            .map(|(term, docs)| {
                (
                    term.clone(),
                    docs.iter().map(|(&id, &tf)| (id, tf)).collect(),
                )
            })
            .collect();
        let doc_lengths = index.doc_lengths().iter().map(|(&id, &len)| (id, len)).collect();
        Self {
            k1: params.k1,
            b: params.b,
            postings,
            doc_lengths,
        }
    }

    /// Rebuild an index from captured state.
    pub fn into_index(self) -> (InvertedIndex, Bm25Params) {
        let mut docs: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (&doc_id, _) in &self.doc_lengths {
            docs.insert(doc_id, Vec::new());
        }
        for (term, postings) in &self.postings {
            for (&doc_id, &tf) in postings {
                let terms = docs.entry(doc_id).or_default();
                for _ in 0..tf {
                    terms.push(term.clone());
                }
            }
        }
        let mut index = InvertedIndex::new();
        for (doc_id, terms) in docs {
            index.add_document(doc_id, &terms);
        }
        (
            index,
            Bm25Params {
                k1: self.k1,
                b: self.b,
            },
        )
    }
}

/// Write the vector array artifact.
pub fn write_vectors(path: &Path, index: &DenseIndex) -> PersistenceResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&VECTORS_MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(index.len() as u32)?;
    writer.write_u32::<LittleEndian>(index.dimension() as u32)?;

    let mut hasher = crc32fast::Hasher::new();
    for &value in index.raw_vectors() {
        let bytes = value.to_le_bytes();
        hasher.update(&bytes);
        writer.write_all(&bytes)?;
    }
    writer.write_u32::<LittleEndian>(hasher.finalize())?;
    writer.flush()?;
    Ok(())
}

/// Read the vector array artifact.
pub fn read_vectors(path: &Path) -> PersistenceResult<DenseIndex> {
    let mut reader = BufReader::new(open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != VECTORS_MAGIC {
        return Err(bad_magic(&VECTORS_MAGIC, &magic));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(bad_version(version));
    }
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let dim = reader.read_u32::<LittleEndian>()? as usize;
    if dim == 0 {
        return Err(PersistenceError::Format {
            message: "vector dimension is zero".to_string(),
            expected: None,
            actual: None,
        });
    }

    let mut hasher = crc32fast::Hasher::new();
    let mut vectors = Vec::with_capacity(count * dim);
    let mut buf = [0u8; 4];
    for _ in 0..count * dim {
        reader.read_exact(&mut buf)?;
        hasher.update(&buf);
        vectors.push(f32::from_le_bytes(buf));
    }
    let expected = reader.read_u32::<LittleEndian>()?;
    let actual = hasher.finalize();
    if expected != actual {
        return Err(PersistenceError::ChecksumMismatch { expected, actual });
    }

    DenseIndex::from_raw(vectors, dim).map_err(|e| PersistenceError::Format {
        message: e.to_string(),
        expected: None,
        actual: None,
    })
}

/// Write the ANN graph artifact.
pub fn write_graph(path: &Path, graph: &HnswGraph) -> PersistenceResult<()> {
    let payload = postcard::to_allocvec(graph)?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&GRAPH_MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_all(&payload)?;
    writer.write_u32::<LittleEndian>(hasher.finalize())?;
    writer.flush()?;
    Ok(())
}

/// Read the ANN graph artifact.
pub fn read_graph(path: &Path) -> PersistenceResult<HnswGraph> {
    let mut reader = BufReader::new(open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != GRAPH_MAGIC {
        return Err(bad_magic(&GRAPH_MAGIC, &magic));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(bad_version(version));
    }
    let len = reader.read_u64::<LittleEndian>()? as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let expected = reader.read_u32::<LittleEndian>()?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);
    let actual = hasher.finalize();
    if expected != actual {
        return Err(PersistenceError::ChecksumMismatch { expected, actual });
    }

    Ok(postcard::from_bytes(&payload)?)
}

/// Write the BM25 state artifact.
pub fn write_bm25(path: &Path, index: &InvertedIndex, params: Bm25Params) -> PersistenceResult<()> {
    let state = Bm25State::from_index(index, params);
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &state)?;
    writer.flush()?;
    Ok(())
}

/// Read the BM25 state artifact.
pub fn read_bm25(path: &Path) -> PersistenceResult<(InvertedIndex, Bm25Params)> {
    let reader = BufReader::new(open(path)?);
    let state: Bm25State = serde_json::from_reader(reader)?;
    Ok(state.into_index())
}

/// Write the `fund_id -> row` mapping artifact.
pub fn write_mapping(path: &Path, mapping: &BTreeMap<String, u32>) -> PersistenceResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, mapping)?;
    writer.flush()?;
    Ok(())
}

/// Read the `fund_id -> row` mapping artifact.
pub fn read_mapping(path: &Path) -> PersistenceResult<BTreeMap<String, u32>> {
    let reader = BufReader::new(open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write the sidecar manifest.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> PersistenceResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, manifest)?;
    writer.flush()?;
    Ok(())
}

/// Read the sidecar manifest.
pub fn read_manifest(path: &Path) -> PersistenceResult<Manifest> {
    let reader = BufReader::new(open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// A complete set of restored artifacts.
pub struct Artifacts {
    pub dense: DenseIndex,
    pub graph: HnswGraph,
    pub bm25: InvertedIndex,
    pub bm25_params: Bm25Params,
    pub mapping: BTreeMap<String, u32>,
    pub manifest: Manifest,
}

/// Write all artifacts into a directory.
pub fn save_all(
    dir: &Path,
    dense: &DenseIndex,
    graph: &HnswGraph,
    bm25: &InvertedIndex,
    bm25_params: Bm25Params,
    mapping: &BTreeMap<String, u32>,
    manifest: &Manifest,
) -> PersistenceResult<()> {
    std::fs::create_dir_all(dir)?;
    write_vectors(&dir.join(VECTORS_FILE), dense)?;
    write_graph(&dir.join(GRAPH_FILE), graph)?;
    write_bm25(&dir.join(BM25_FILE), bm25, bm25_params)?;
    write_mapping(&dir.join(MAPPING_FILE), mapping)?;
    write_manifest(&dir.join(MANIFEST_FILE), manifest)?;
    Ok(())
}

/// Restore all artifacts from a directory, validating cross-file
/// consistency.
///
/// # Errors
///
/// Besides per-file format errors, fails with `CountMismatch` when the
/// vector count differs from the mapping size, and with a `Format` error
/// when the stored dimension disagrees with the manifest.
pub fn load_all(dir: &Path) -> PersistenceResult<Artifacts> {
    let dense = read_vectors(&dir.join(VECTORS_FILE))?;
    let graph = read_graph(&dir.join(GRAPH_FILE))?;
    let (bm25, bm25_params) = read_bm25(&dir.join(BM25_FILE))?;
    let mapping = read_mapping(&dir.join(MAPPING_FILE))?;
    let manifest = read_manifest(&dir.join(MANIFEST_FILE))?;

    if dense.len() != mapping.len() {
        return Err(PersistenceError::CountMismatch {
            vectors: dense.len(),
            mapping: mapping.len(),
        });
    }
    if dense.dimension() != manifest.embedding_dim {
        return Err(PersistenceError::Format {
            message: "embedding dimension disagrees with manifest".to_string(),
            expected: Some(manifest.embedding_dim.to_string()),
            actual: Some(dense.dimension().to_string()),
        });
    }

    Ok(Artifacts {
        dense,
        graph,
        bm25,
        bm25_params,
        mapping,
        manifest,
    })
}

fn open(path: &Path) -> PersistenceResult<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PersistenceError::NotFound(path.display().to_string())
        } else {
            PersistenceError::Io(e)
        }
    })
}

fn bad_magic(expected: &[u8; 4], actual: &[u8; 4]) -> PersistenceError {
    PersistenceError::Format {
        message: "invalid magic bytes".to_string(),
        expected: Some(format!("{:?}", expected)),
        actual: Some(format!("{:?}", actual)),
    }
}

fn bad_version(actual: u32) -> PersistenceError {
    PersistenceError::Format {
        message: "format version mismatch".to_string(),
        expected: Some(FORMAT_VERSION.to_string()),
        actual: Some(actual.to_string()),
    }
}
