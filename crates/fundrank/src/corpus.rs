//! In-memory corpus store and description synthesis.

use crate::error::BuildError;
use crate::record::FundRecord;
use std::collections::HashMap;

/// Mapping from fund identifier to record, plus a stable row order.
///
/// Rows are assigned by ascending `fund_id` so that index builds are
/// deterministic regardless of input order.
#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    records: HashMap<String, FundRecord>,
    /// Row order: ascending fund_id.
    ordered_ids: Vec<String>,
}

impl CorpusStore {
    /// Build a store from validated records.
    ///
    /// Synthesizes each record's `description` and rejects duplicates.
    pub fn from_records(records: Vec<FundRecord>) -> Result<Self, BuildError> {
        let mut store = Self::default();
        for mut record in records {
            if store.records.contains_key(&record.fund_id) {
                return Err(BuildError::DuplicateFundId(record.fund_id));
            }
            record.description = synthesize_description(&record);
            store.ordered_ids.push(record.fund_id.clone());
            store.records.insert(record.fund_id.clone(), record);
        }
        store.ordered_ids.sort();
        Ok(store)
    }

    /// Number of funds in the corpus.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the corpus has no funds.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by fund id.
    pub fn get(&self, fund_id: &str) -> Option<&FundRecord> {
        self.records.get(fund_id)
    }

    /// Fund ids in row order.
    pub fn ordered_ids(&self) -> &[String] {
        &self.ordered_ids
    }

    /// Records in row order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &FundRecord> {
        self.ordered_ids.iter().filter_map(|id| self.records.get(id))
    }

    /// CRC32 checksum over the ordered corpus content, hex-encoded.
    ///
    /// Recorded in the build manifest so a restored index can be checked
    /// against the corpus it was built from.
    pub fn checksum(&self) -> String {
        let mut hasher = crc32fast::Hasher::new();
        for record in self.iter_ordered() {
            hasher.update(record.fund_id.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(record.fund_name.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(record.description.as_bytes());
            hasher.update(b"\x1e");
        }
        format!("{:08x}", hasher.finalize())
    }
}

/// Generate the natural-language description indexed for a fund.
///
/// Concatenates templated sentences over the metadata that is present.
/// Missing fields are omitted entirely, never rendered as "N/A"; the
/// indexed text must not teach the lexical index a fake token.
pub fn synthesize_description(record: &FundRecord) -> String {
    let mut sentences: Vec<String> = Vec::new();

    let mut opening = format!("{} is a fund offered by {}", record.fund_name, record.fund_house);
    match (&record.category, &record.sub_category) {
        (category, Some(sub)) if !category.is_empty() => {
            opening.push_str(&format!(" in the {} {} category", category, sub));
        }
        (category, None) if !category.is_empty() => {
            opening.push_str(&format!(" in the {} category", category));
        }
        _ => {}
    }
    opening.push('.');
    sentences.push(opening);

    if let Some(sector) = record.sector.as_deref().filter(|s| !s.is_empty()) {
        sentences.push(format!("It invests in the {} sector.", sector));
    }

    if let Some(risk) = &record.risk_level {
        sentences.push(format!("The fund carries {} risk.", risk.as_str().to_lowercase()));
    }

    if !record.top_holdings.is_empty() {
        let holdings: Vec<&str> = record
            .top_holdings
            .iter()
            .take(3)
            .map(|h| h.as_str())
            .collect();
        sentences.push(format!("Top holdings include {}.", holdings.join(", ")));
    }

    if !record.sector_allocation.is_empty() {
        let allocations: Vec<String> = record
            .sector_allocation
            .iter()
            .take(3)
            .map(|sw| format!("{} {:.1}%", sw.sector, sw.weight * 100.0))
            .collect();
        sentences.push(format!("Sector allocation: {}.", allocations.join(", ")));
    }

    sentences.join(" ")
}
