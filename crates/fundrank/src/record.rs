//! Fund record model.

use fundrank_query::RiskTier;
use serde::{Deserialize, Serialize};

/// Canonical risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Display name used in descriptions and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }

    /// Lenient parse from upstream data ("low", "MODERATE", "Moderately
    /// High", "medium"). Returns `None` for unrecognized text.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower.contains("low") {
            Some(RiskLevel::Low)
        } else if lower.contains("mod") || lower.contains("medium") {
            Some(RiskLevel::Moderate)
        } else if lower.contains("high") || lower.contains("aggressive") {
            Some(RiskLevel::High)
        } else {
            None
        }
    }

    /// Match a parsed query tier against this level.
    pub fn matches_tier(&self, tier: &RiskTier) -> bool {
        matches!(
            (self, tier),
            (RiskLevel::Low, RiskTier::Low)
                | (RiskLevel::Moderate, RiskTier::Moderate)
                | (RiskLevel::High, RiskTier::High)
        )
    }

    /// True when this level is one tier away from the queried tier.
    pub fn is_adjacent_tier(&self, tier: &RiskTier) -> bool {
        let own = match self {
            RiskLevel::Low => RiskTier::Low,
            RiskLevel::Moderate => RiskTier::Moderate,
            RiskLevel::High => RiskTier::High,
        };
        own.is_adjacent(tier)
    }
}

/// One sector allocation entry: sector name and weight as a fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorWeight {
    pub sector: String,
    pub weight: f32,
}

/// A single fund in the catalog.
///
/// Numeric attributes are optional; absence is meaningful and is never
/// treated as zero by the scorer. Returns are percentages, AUM is in crore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub fund_id: String,
    pub fund_name: String,
    pub fund_house: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub asset_class: Option<String>,
    pub fund_type: Option<String>,
    pub sector: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub expense_ratio: Option<f32>,
    pub return_1yr: Option<f32>,
    pub return_3yr: Option<f32>,
    pub return_5yr: Option<f32>,
    pub aum: Option<f32>,
    pub top_holdings: Vec<String>,
    pub sector_allocation: Vec<SectorWeight>,
    /// Generated at ingestion; always non-empty after a successful build.
    pub description: String,
}

impl FundRecord {
    /// Validate record invariants.
    ///
    /// Returns a human-readable reason on failure; the ingestion layer
    /// attaches the line number.
    pub fn validate(&self) -> Result<(), String> {
        if self.fund_id.trim().is_empty() {
            return Err("missing fund_id".to_string());
        }
        if self.fund_name.trim().is_empty() {
            return Err("missing fund_name".to_string());
        }
        for (name, value) in [
            ("expense_ratio", self.expense_ratio),
            ("return_1yr", self.return_1yr),
            ("return_3yr", self.return_3yr),
            ("return_5yr", self.return_5yr),
            ("aum", self.aum),
        ] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(format!("{} is not finite", name));
                }
            }
        }
        for (name, value) in [
            ("return_1yr", self.return_1yr),
            ("return_3yr", self.return_3yr),
            ("return_5yr", self.return_5yr),
        ] {
            if let Some(v) = value {
                if !(-100.0..=1000.0).contains(&v) {
                    return Err(format!("{} {} outside [-100, 1000]", name, v));
                }
            }
        }
        if let Some(v) = self.expense_ratio {
            if v < 0.0 {
                return Err(format!("expense_ratio {} is negative", v));
            }
        }
        if let Some(v) = self.aum {
            if v < 0.0 {
                return Err(format!("aum {} is negative", v));
            }
        }
        Ok(())
    }

    /// Return for a queried period, if known.
    pub fn return_for(&self, period: fundrank_query::ReturnPeriod) -> Option<f32> {
        match period {
            fundrank_query::ReturnPeriod::OneYear => self.return_1yr,
            fundrank_query::ReturnPeriod::ThreeYear => self.return_3yr,
            fundrank_query::ReturnPeriod::FiveYear => self.return_5yr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(id: &str) -> FundRecord {
        FundRecord {
            fund_id: id.to_string(),
            fund_name: "Test Fund".to_string(),
            fund_house: "Test".to_string(),
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

    #[test]
    fn test_risk_parse_lenient() {
        assert_eq!(RiskLevel::parse("Low"), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::parse("MODERATELY HIGH"), Some(RiskLevel::Moderate));
        assert_eq!(RiskLevel::parse("medium"), Some(RiskLevel::Moderate));
        assert_eq!(RiskLevel::parse("high"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse(""), None);
        assert_eq!(RiskLevel::parse("unknown"), None);
    }

    #[test]
    fn test_adjacent_tiers() {
        assert!(RiskLevel::Low.is_adjacent_tier(&RiskTier::Moderate));
        assert!(RiskLevel::High.is_adjacent_tier(&RiskTier::Moderate));
        assert!(!RiskLevel::Low.is_adjacent_tier(&RiskTier::High));
        assert!(!RiskLevel::Low.is_adjacent_tier(&RiskTier::Low));
    }

    #[test]
    fn test_validation_bounds() {
        let mut record = minimal("F1");
        assert!(record.validate().is_ok());

        record.return_3yr = Some(2000.0);
        assert!(record.validate().is_err());

        record.return_3yr = Some(12.0);
        record.expense_ratio = Some(-0.5);
        assert!(record.validate().is_err());

        record.expense_ratio = Some(f32::NAN);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_missing_id_rejected() {
        let record = minimal("  ");
        assert!(record.validate().is_err());
    }
}
