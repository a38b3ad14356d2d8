//! CSV ingestion for the fund corpus.
//!
//! The upstream input contract is one row per fund with the columns of the
//! data model. Numeric fields are parsed leniently (stray `%`, commas and
//! whitespace are tolerated); a row missing `fund_id` or `fund_name` is
//! rejected with its line number.

use crate::error::BuildError;
use crate::record::{FundRecord, RiskLevel, SectorWeight};
use std::io::Read;
use std::path::Path;

/// Read fund records from a CSV file.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Vec<FundRecord>, BuildError> {
    let file = std::fs::File::open(path)?;
    read_csv(file)
}

/// Read fund records from any CSV source.
///
/// # Errors
///
/// Fails on unreadable CSV and on any row that violates the record
/// invariants, carrying the offending 1-based line number.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<FundRecord>, BuildError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| BuildError::MalformedRow {
            line: 1,
            message: format!("unreadable header: {}", e),
        })?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let columns = Columns {
        fund_id: column("fund_id"),
        fund_name: column("fund_name"),
        fund_house: column("fund_house"),
        category: column("category"),
        sub_category: column("sub_category"),
        asset_class: column("asset_class"),
        fund_type: column("fund_type"),
        sector: column("sector"),
        risk_level: column("risk_level"),
        expense_ratio: column("expense_ratio"),
        return_1yr: column("return_1yr"),
        return_3yr: column("return_3yr"),
        return_5yr: column("return_5yr"),
        aum: column("aum"),
        top_holdings: column("top_holdings"),
        sector_allocation: column("sector_allocation"),
    };

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        // Header occupies line 1.
        let line = index + 2;
        let row = row.map_err(|e| BuildError::MalformedRow {
            line,
            message: e.to_string(),
        })?;

        let record = parse_row(&row, &columns).map_err(|message| BuildError::MalformedRow {
            line,
            message,
        })?;
        record
            .validate()
            .map_err(|message| BuildError::MalformedRow { line, message })?;
        records.push(record);
    }
    Ok(records)
}

struct Columns {
    fund_id: Option<usize>,
    fund_name: Option<usize>,
    fund_house: Option<usize>,
    category: Option<usize>,
    sub_category: Option<usize>,
    asset_class: Option<usize>,
    fund_type: Option<usize>,
    sector: Option<usize>,
    risk_level: Option<usize>,
    expense_ratio: Option<usize>,
    return_1yr: Option<usize>,
    return_3yr: Option<usize>,
    return_5yr: Option<usize>,
    aum: Option<usize>,
    top_holdings: Option<usize>,
    sector_allocation: Option<usize>,
}

fn parse_row(row: &csv::StringRecord, columns: &Columns) -> Result<FundRecord, String> {
    let text = |idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| row.get(i))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let fund_id = text(columns.fund_id).ok_or("missing fund_id")?;
    let fund_name = text(columns.fund_name).ok_or("missing fund_name")?;

    Ok(FundRecord {
        fund_id,
        fund_name,
        fund_house: text(columns.fund_house).unwrap_or_default(),
        category: text(columns.category).unwrap_or_default(),
        sub_category: text(columns.sub_category),
        asset_class: text(columns.asset_class),
        fund_type: text(columns.fund_type),
        sector: text(columns.sector),
        risk_level: text(columns.risk_level).and_then(|s| RiskLevel::parse(&s)),
        expense_ratio: text(columns.expense_ratio).and_then(|s| lenient_number(&s)),
        return_1yr: text(columns.return_1yr).and_then(|s| lenient_number(&s)),
        return_3yr: text(columns.return_3yr).and_then(|s| lenient_number(&s)),
        return_5yr: text(columns.return_5yr).and_then(|s| lenient_number(&s)),
        aum: text(columns.aum).and_then(|s| lenient_number(&s)),
        top_holdings: text(columns.top_holdings)
            .map(|s| {
                s.split('|')
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        sector_allocation: text(columns.sector_allocation)
            .map(|s| parse_sector_allocation(&s))
            .unwrap_or_default(),
        description: String::new(),
    })
}

/// Lenient numeric parse: tolerates `%` suffixes, thousands separators and
/// surrounding whitespace. Unparseable text becomes `None`, not an error.
fn lenient_number(text: &str) -> Option<f32> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse().ok()
}

/// Parse `"Technology:0.45|Financial Services:0.20"` pairs.
///
/// Entries with an unparseable weight are skipped.
fn parse_sector_allocation(text: &str) -> Vec<SectorWeight> {
    text.split('|')
        .filter_map(|entry| {
            let (sector, weight) = entry.rsplit_once(':')?;
            let weight: f32 = weight.trim().parse().ok()?;
            let sector = sector.trim();
            if sector.is_empty() || !weight.is_finite() {
                return None;
            }
            Some(SectorWeight {
                sector: sector.to_string(),
                weight,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "fund_id,fund_name,fund_house,category,sub_category,asset_class,fund_type,sector,risk_level,expense_ratio,return_1yr,return_3yr,return_5yr,aum,top_holdings,sector_allocation";

    #[test]
    fn test_full_row() {
        let csv = format!(
            "{}\nF001,SBI Technology Fund,SBI,Equity,Sectoral,Equity,Open Ended,Technology,High,0.95,22.1,18.5%,16.0,\"12,500\",Infosys|TCS|Wipro,Technology:0.65|Financial Services:0.15",
            HEADER
        );
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.fund_id, "F001");
        assert_eq!(record.risk_level, Some(RiskLevel::High));
        assert_eq!(record.return_3yr, Some(18.5));
        assert_eq!(record.aum, Some(12500.0));
        assert_eq!(record.top_holdings.len(), 3);
        assert_eq!(record.sector_allocation[0].sector, "Technology");
        assert!((record.sector_allocation[0].weight - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_missing_fund_id_reports_line() {
        let csv = format!("{}\n,Nameless Fund,SBI,Equity,,,,,,,,,,,,", HEADER);
        let err = read_csv(csv.as_bytes()).unwrap_err();
        match err {
            BuildError::MalformedRow { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("fund_id"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_numerics_become_none() {
        let csv = format!("{}\nF001,Sparse Fund,SBI,Debt,,,,,,,not-a-number,,,,,", HEADER);
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].return_1yr, None);
        assert_eq!(records[0].expense_ratio, None);
    }

    #[test]
    fn test_out_of_range_return_is_rejected() {
        let csv = format!("{}\nF001,Wild Fund,SBI,Equity,,,,,,,5000,,,,,", HEADER);
        assert!(matches!(
            read_csv(csv.as_bytes()),
            Err(BuildError::MalformedRow { line: 2, .. })
        ));
    }
}
