//! Rule-based query parsing.
//!
//! A query is normalized, then a fixed sequence of extractors runs over it.
//! Each extractor consumes the substrings it recognizes (replacing them with
//! whitespace) and records which substring produced which constraint. The
//! text left over after every extractor has run is the residual semantic
//! query.
//!
//! Extractor order is part of the contract and must not change:
//! fund house, risk level, category, sector, minimum return, maximum
//! expense ratio, minimum AUM, horizon hints.
//!
//! Numeric constraints outside their sane range are dropped with a
//! [`ParseWarning`] and a `tracing` warning; parsing always succeeds.

use crate::normalize::normalize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Risk tiers in ascending order of risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// Canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
        }
    }

    /// True for neighboring tiers (Low/Moderate, Moderate/High).
    pub fn is_adjacent(&self, other: &RiskTier) -> bool {
        let rank = |t: &RiskTier| match t {
            RiskTier::Low => 0i8,
            RiskTier::Moderate => 1,
            RiskTier::High => 2,
        };
        (rank(self) - rank(other)).abs() == 1
    }
}

/// Return horizon referenced by a minimum-return constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnPeriod {
    OneYear,
    ThreeYear,
    FiveYear,
}

impl ReturnPeriod {
    /// Number of years in the period.
    pub fn years(&self) -> u8 {
        match self {
            ReturnPeriod::OneYear => 1,
            ReturnPeriod::ThreeYear => 3,
            ReturnPeriod::FiveYear => 5,
        }
    }
}

/// A structured filter constraint extracted from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Fund house equality (canonical AMC name, matched case-insensitively).
    Amc(String),
    /// Category equality (canonical category name).
    Category(String),
    /// Sector equality (canonical sector name).
    Sector(String),
    /// Risk level equality.
    RiskLevel(RiskTier),
    /// Minimum return over a period, in percent.
    MinReturn { period: ReturnPeriod, pct: f32 },
    /// Maximum expense ratio, in percent.
    MaxExpenseRatio(f32),
    /// Minimum assets under management, in corpus AUM units.
    MinAum(f32),
}

impl Constraint {
    /// Stable field name used in explanations and logs.
    pub fn field_name(&self) -> &'static str {
        match self {
            Constraint::Amc(_) => "amc",
            Constraint::Category(_) => "category",
            Constraint::Sector(_) => "sector",
            Constraint::RiskLevel(_) => "risk_level",
            Constraint::MinReturn { period, .. } => match period {
                ReturnPeriod::OneYear => "min_return_1yr",
                ReturnPeriod::ThreeYear => "min_return_3yr",
                ReturnPeriod::FiveYear => "min_return_5yr",
            },
            Constraint::MaxExpenseRatio(_) => "max_expense_ratio",
            Constraint::MinAum(_) => "min_aum",
        }
    }
}

/// Advisory suitability tag. Never a hard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuitabilityTag {
    LongTerm,
    ShortTerm,
}

/// A recognized-but-rejected fragment, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub message: String,
    /// The offending substring as it appeared in the normalized query.
    pub source: String,
}

/// Which substring produced which constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanContribution {
    pub text: String,
    pub constraint: &'static str,
}

/// The result of parsing a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// Whatever no extractor recognized; the semantic query.
    pub residual: String,
    pub constraints: Vec<Constraint>,
    pub tags: Vec<SuitabilityTag>,
    pub warnings: Vec<ParseWarning>,
    pub contributions: Vec<SpanContribution>,
}

impl ParsedQuery {
    /// No residual text and no constraints: the search returns nothing.
    pub fn is_empty(&self) -> bool {
        self.residual.trim().is_empty() && self.constraints.is_empty()
    }

    /// The extracted fund-house constraint, if any.
    pub fn amc(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Amc(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Reconstruct a canonical query string.
    ///
    /// Parsing the rendered string yields the same residual, constraints
    /// and tags (the idempotence property).
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.residual.trim().is_empty() {
            parts.push(self.residual.trim().to_string());
        }
        for constraint in &self.constraints {
            parts.push(match constraint {
                Constraint::Amc(name) => name.to_lowercase(),
                Constraint::Category(name) => {
                    if name == "ELSS" {
                        "tax saver".to_string()
                    } else {
                        name.to_lowercase()
                    }
                }
                Constraint::Sector(name) => name.to_lowercase(),
                Constraint::RiskLevel(tier) => match tier {
                    RiskTier::Low => "low risk".to_string(),
                    RiskTier::Moderate => "moderate".to_string(),
                    RiskTier::High => "high risk".to_string(),
                },
                Constraint::MinReturn { period, pct } => format!(
                    "{} year returns above {}%",
                    period.years(),
                    fmt_num(*pct)
                ),
                Constraint::MaxExpenseRatio(pct) => {
                    format!("expense ratio under {}%", fmt_num(*pct))
                }
                Constraint::MinAum(value) => format!("aum over {}", fmt_num(*value)),
            });
        }
        for tag in &self.tags {
            parts.push(match tag {
                SuitabilityTag::LongTerm => "long term".to_string(),
                SuitabilityTag::ShortTerm => "short term".to_string(),
            });
        }
        parts.join(" ")
    }
}

fn fmt_num(x: f32) -> String {
    if x.fract() == 0.0 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Alias table entry: lowercase alias phrase, canonical value.
type Alias = (&'static str, &'static str);

/// Fund house aliases. Longest phrases first so alternation prefers them.
const HOUSE_ALIASES: &[Alias] = &[
    ("franklin templeton", "Franklin Templeton"),
    ("aditya birla", "Aditya Birla"),
    ("mirae asset", "Mirae Asset"),
    ("franklin", "Franklin Templeton"),
    ("mirae", "Mirae Asset"),
    ("icici", "ICICI"),
    ("hdfc", "HDFC"),
    ("kotak", "Kotak"),
    ("nippon", "Nippon"),
    ("axis", "Axis"),
    ("tata", "Tata"),
    ("sbi", "SBI"),
    ("dsp", "DSP"),
    ("uti", "UTI"),
];

const RISK_ALIASES: &[(&str, RiskTier)] = &[
    ("low risk", RiskTier::Low),
    ("low-risk", RiskTier::Low),
    ("conservative", RiskTier::Low),
    ("safe", RiskTier::Low),
    ("moderate risk", RiskTier::Moderate),
    ("moderate", RiskTier::Moderate),
    ("medium", RiskTier::Moderate),
    ("balanced", RiskTier::Moderate),
    ("high risk", RiskTier::High),
    ("high-risk", RiskTier::High),
    ("aggressive", RiskTier::High),
];

const CATEGORY_ALIASES: &[Alias] = &[
    ("tax-saving equity-linked saving scheme", "ELSS"),
    ("tax saver", "ELSS"),
    ("tax-saver", "ELSS"),
    ("tax saving", "ELSS"),
    ("tax-saving", "ELSS"),
    ("large cap", "Large Cap"),
    ("large-cap", "Large Cap"),
    ("largecap", "Large Cap"),
    ("mid cap", "Mid Cap"),
    ("mid-cap", "Mid Cap"),
    ("midcap", "Mid Cap"),
    ("small cap", "Small Cap"),
    ("small-cap", "Small Cap"),
    ("smallcap", "Small Cap"),
    ("flexi cap", "Flexi Cap"),
    ("flexi-cap", "Flexi Cap"),
    ("flexicap", "Flexi Cap"),
    ("index", "Index"),
    ("debt", "Debt"),
    ("liquid", "Liquid"),
    ("hybrid", "Hybrid"),
    ("equity", "Equity"),
];

const SECTOR_ALIASES: &[Alias] = &[
    ("information technology", "Technology"),
    ("financial services", "Financial Services"),
    ("consumer goods", "Consumer Goods"),
    ("health care", "Healthcare"),
    ("health-care", "Healthcare"),
    ("infrastructure", "Infrastructure"),
    ("pharmaceutical", "Healthcare"),
    ("healthcare", "Healthcare"),
    ("technology", "Technology"),
    ("automobile", "Automobile"),
    ("financial", "Financial Services"),
    ("banking", "Financial Services"),
    ("finance", "Financial Services"),
    ("consumer", "Consumer Goods"),
    ("banks", "Financial Services"),
    ("pharma", "Healthcare"),
    ("energy", "Energy"),
    ("infra", "Infrastructure"),
    ("power", "Energy"),
    ("fmcg", "Consumer Goods"),
    ("tech", "Technology"),
    ("bank", "Financial Services"),
    ("auto", "Automobile"),
    ("it", "Technology"),
];

/// Sane range for percentage constraints (returns, expense ratio).
fn pct_in_range(pct: f32) -> bool {
    (0.0..=100.0).contains(&pct)
}

/// Rule-based query parser with precompiled extractors.
///
/// Construct once and reuse; `parse` takes `&self` and is safe to call from
/// concurrent requests.
pub struct QueryParser {
    house_re: Regex,
    risk_re: Regex,
    category_re: Regex,
    sector_re: Regex,
    return_re: Regex,
    expense_re: Regex,
    aum_re: Regex,
    horizon_re: Regex,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    /// Compile the extractor regexes.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in patterns are invalid, which would be a
    /// bug caught by the crate's own tests.
    pub fn new() -> Self {
        let alternation = |aliases: &[Alias]| {
            aliases
                .iter()
                .map(|(alias, _)| regex::escape(alias))
                .collect::<Vec<_>>()
                .join("|")
        };
        let house = alternation(HOUSE_ALIASES);
        let risk = RISK_ALIASES
            .iter()
            .map(|(alias, _)| regex::escape(alias))
            .collect::<Vec<_>>()
            .join("|");
        let category = alternation(CATEGORY_ALIASES);
        let sector = alternation(SECTOR_ALIASES);

        Self {
            house_re: Regex::new(&format!(r"\b({})\b", house)).expect("house pattern"),
            risk_re: Regex::new(&format!(r"\b({})\b", risk)).expect("risk pattern"),
            category_re: Regex::new(&format!(r"\b({})\b", category)).expect("category pattern"),
            sector_re: Regex::new(&format!(r"\b({})\b", sector)).expect("sector pattern"),
            // Comparator words are optional: ">" does not survive
            // normalization, so "returns 12%" is the normalized form of
            // "returns > 12%".
            return_re: Regex::new(
                r"(?:\b([135])\s*years?\s+)?\breturns?\s+(?:over|above|at least|more than|exceeding)?\s*(\d+(?:\.\d+)?)\s*%?",
            )
            .expect("return pattern"),
            expense_re: Regex::new(
                r"\bexpense\s+ratio\s+(?:less than|below|under)?\s*(\d+(?:\.\d+)?)\s*%?",
            )
            .expect("expense pattern"),
            aum_re: Regex::new(
                r"\baum\s+(?:over|above)?\s*(\d+(?:\.\d+)?)\s*(crores|crore|cr|lakhs|lakh|billion|million)?\b",
            )
            .expect("aum pattern"),
            horizon_re: Regex::new(r"\b(retirement|long[- ]term|short[- ]term)\b")
                .expect("horizon pattern"),
        }
    }

    /// Parse a raw query into residual text plus constraints.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let mut residual = normalize(query);
        let mut parsed = ParsedQuery {
            residual: String::new(),
            constraints: Vec::new(),
            tags: Vec::new(),
            warnings: Vec::new(),
            contributions: Vec::new(),
        };

        // Numeric extractors run against phrases containing dictionary
        // words ("3 year returns"), so dictionary extraction for
        // categorical fields must not consume inside them; the fixed order
        // below keeps the two families disjoint in practice.
        self.extract_house(&mut residual, &mut parsed);
        self.extract_risk(&mut residual, &mut parsed);
        self.extract_category(&mut residual, &mut parsed);
        self.extract_sector(&mut residual, &mut parsed);
        self.extract_min_return(&mut residual, &mut parsed);
        self.extract_max_expense(&mut residual, &mut parsed);
        self.extract_min_aum(&mut residual, &mut parsed);
        self.extract_horizon(&mut residual, &mut parsed);

        parsed.residual = residual.split_whitespace().collect::<Vec<_>>().join(" ");
        parsed
    }

    /// Consume every match of a dictionary family, producing a constraint
    /// from the first. Later aliases of the same family are swallowed so
    /// that re-parsing a rendered query cannot flip the constraint
    /// (idempotence).
    fn consume_family(re: &Regex, residual: &mut String) -> Option<String> {
        let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
        let mut first: Option<String> = None;
        for m in re.find_iter(residual) {
            if first.is_none() {
                first = Some(m.as_str().to_string());
            }
            ranges.push(m.range());
        }
        for range in ranges {
            blank(residual, range);
        }
        first
    }

    fn extract_house(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let Some(matched) = Self::consume_family(&self.house_re, residual) else {
            return;
        };
        let canonical = HOUSE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == matched)
            .map(|(_, canonical)| canonical.to_string());
        if let Some(canonical) = canonical {
            let constraint = Constraint::Amc(canonical);
            parsed.contributions.push(SpanContribution {
                text: matched,
                constraint: constraint.field_name(),
            });
            parsed.constraints.push(constraint);
        }
    }

    fn extract_risk(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let Some(matched) = Self::consume_family(&self.risk_re, residual) else {
            return;
        };
        let tier = RISK_ALIASES
            .iter()
            .find(|(alias, _)| *alias == matched)
            .map(|(_, tier)| *tier);
        if let Some(tier) = tier {
            let constraint = Constraint::RiskLevel(tier);
            parsed.contributions.push(SpanContribution {
                text: matched,
                constraint: constraint.field_name(),
            });
            parsed.constraints.push(constraint);
        }
    }

    fn extract_category(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let Some(matched) = Self::consume_family(&self.category_re, residual) else {
            return;
        };
        let canonical = CATEGORY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == matched)
            .map(|(_, canonical)| canonical.to_string());
        if let Some(canonical) = canonical {
            let constraint = Constraint::Category(canonical);
            parsed.contributions.push(SpanContribution {
                text: matched,
                constraint: constraint.field_name(),
            });
            parsed.constraints.push(constraint);
        }
    }

    fn extract_sector(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let Some(matched) = Self::consume_family(&self.sector_re, residual) else {
            return;
        };
        let canonical = SECTOR_ALIASES
            .iter()
            .find(|(alias, _)| *alias == matched)
            .map(|(_, canonical)| canonical.to_string());
        if let Some(canonical) = canonical {
            let constraint = Constraint::Sector(canonical);
            parsed.contributions.push(SpanContribution {
                text: matched,
                constraint: constraint.field_name(),
            });
            parsed.constraints.push(constraint);
        }
    }

    fn extract_min_return(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
        for caps in self.return_re.captures_iter(residual) {
            let whole = caps.get(0).expect("capture 0");
            let period = match caps.get(1).map(|m| m.as_str()) {
                Some("1") => ReturnPeriod::OneYear,
                Some("5") => ReturnPeriod::FiveYear,
                // A bare "returns above X%" defaults to the three-year
                // horizon.
                _ => ReturnPeriod::ThreeYear,
            };
            let pct: f32 = match caps.get(2).and_then(|m| m.as_str().parse().ok()) {
                Some(v) => v,
                None => continue,
            };

            if !pct_in_range(pct) {
                warn!(source = whole.as_str(), pct, "dropping out-of-range return constraint");
                parsed.warnings.push(ParseWarning {
                    message: format!("return threshold {}% outside [0, 100]", fmt_num(pct)),
                    source: whole.as_str().to_string(),
                });
                ranges.push(whole.range());
                continue;
            }

            let duplicate = parsed.constraints.iter().any(
                |c| matches!(c, Constraint::MinReturn { period: p, .. } if *p == period),
            );
            if !duplicate {
                let constraint = Constraint::MinReturn { period, pct };
                parsed.contributions.push(SpanContribution {
                    text: whole.as_str().to_string(),
                    constraint: constraint.field_name(),
                });
                parsed.constraints.push(constraint);
            }
            ranges.push(whole.range());
        }
        for range in ranges.into_iter().rev() {
            blank(residual, range);
        }
    }

    fn extract_max_expense(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
        for caps in self.expense_re.captures_iter(residual) {
            let whole = caps.get(0).expect("capture 0");
            ranges.push(whole.range());
            let pct: f32 = match caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                Some(v) => v,
                None => continue,
            };

            if !pct_in_range(pct) {
                warn!(source = whole.as_str(), pct, "dropping out-of-range expense constraint");
                parsed.warnings.push(ParseWarning {
                    message: format!("expense ratio {}% outside [0, 100]", fmt_num(pct)),
                    source: whole.as_str().to_string(),
                });
                continue;
            }
            let duplicate = parsed
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::MaxExpenseRatio(_)));
            if !duplicate {
                let constraint = Constraint::MaxExpenseRatio(pct);
                parsed.contributions.push(SpanContribution {
                    text: whole.as_str().to_string(),
                    constraint: constraint.field_name(),
                });
                parsed.constraints.push(constraint);
            }
        }
        for range in ranges {
            blank(residual, range);
        }
    }

    fn extract_min_aum(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
        for caps in self.aum_re.captures_iter(residual) {
            let whole = caps.get(0).expect("capture 0");
            ranges.push(whole.range());
            let value: f32 = match caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                Some(v) => v,
                None => continue,
            };
            // Unit factor applies only when a suffix is present; a bare
            // number is taken in the same unit as the corpus AUM field
            // (crore).
            let factor = match caps.get(2).map(|m| m.as_str()) {
                Some("lakh") | Some("lakhs") => 0.01,
                Some("million") => 0.1,
                Some("billion") => 100.0,
                _ => 1.0,
            };

            let duplicate = parsed
                .constraints
                .iter()
                .any(|c| matches!(c, Constraint::MinAum(_)));
            if !duplicate {
                let constraint = Constraint::MinAum(value * factor);
                parsed.contributions.push(SpanContribution {
                    text: whole.as_str().to_string(),
                    constraint: constraint.field_name(),
                });
                parsed.constraints.push(constraint);
            }
        }
        for range in ranges {
            blank(residual, range);
        }
    }

    fn extract_horizon(&self, residual: &mut String, parsed: &mut ParsedQuery) {
        let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
        for m in self.horizon_re.find_iter(residual) {
            let tag = if m.as_str().starts_with("short") {
                SuitabilityTag::ShortTerm
            } else {
                SuitabilityTag::LongTerm
            };
            if !parsed.tags.contains(&tag) {
                parsed.tags.push(tag);
            }
            ranges.push(m.range());
        }
        for range in ranges.into_iter().rev() {
            blank(residual, range);
        }
    }
}

/// Replace a byte range with spaces, preserving offsets for later matches.
fn blank(text: &mut String, range: std::ops::Range<usize>) {
    let len = range.len();
    text.replace_range(range, &" ".repeat(len));
}

/// Parse with a freshly compiled parser.
///
/// Engines should hold a [`QueryParser`] and reuse it; this helper exists
/// for tests and one-off callers.
pub fn parse(query: &str) -> ParsedQuery {
    QueryParser::new().parse(query)
}
