//! RAG prompt builder.
//!
//! Formats the top reranked funds into a fixed advisor prompt for a
//! downstream LLM. The prompt is a pure function of the original query and
//! the candidate records; the template and slot count never vary, so the
//! external advisor integration can rely on its shape.

use crate::record::FundRecord;
use serde::Serialize;

/// Number of fund slots in the advisor prompt.
pub const PROMPT_SLOTS: usize = 3;

/// The built prompt together with the records it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct PromptResponse {
    pub prompt: String,
    pub candidates: Vec<FundRecord>,
}

/// Build the advisor prompt from the top candidates.
///
/// Missing numeric fields render as `N/A`; slots beyond the available
/// candidates render as `No additional fund data available.`.
pub fn build_prompt(original_query: &str, funds: &[&FundRecord]) -> String {
    let mut prompt = format!(
        "You are a mutual fund advisor. A user asked: \"{}\".\nHere are top matching funds:\n",
        original_query
    );

    for slot in 0..PROMPT_SLOTS {
        match funds.get(slot) {
            Some(fund) => {
                prompt.push_str(&format!("FUND {}: {}\n", slot + 1, fund.fund_name));
                prompt.push_str(&format!("- AMC: {}\n", fund.fund_house));
                prompt.push_str(&format!("- Category: {}\n", fund.category));
                prompt.push_str(&format!(
                    "- Risk Level: {}\n",
                    fund.risk_level.map(|r| r.as_str()).unwrap_or("N/A")
                ));
                prompt.push_str(&format!(
                    "- Returns: 1yr: {}%, 3yr: {}%, 5yr: {}%\n",
                    fmt_opt(fund.return_1yr),
                    fmt_opt(fund.return_3yr),
                    fmt_opt(fund.return_5yr)
                ));
                prompt.push_str(&format!(
                    "- Expense Ratio: {}%\n",
                    fmt_opt(fund.expense_ratio)
                ));
            }
            None => {
                prompt.push_str(&format!(
                    "FUND {}: No additional fund data available.\n",
                    slot + 1
                ));
            }
        }
    }

    prompt.push_str("Which one is the best match? Explain why in 3 sentences.");
    prompt
}

fn fmt_opt(value: Option<f32>) -> String {
    match value {
        Some(v) => {
            if v.fract() == 0.0 {
                format!("{}", v as i64)
            } else {
                format!("{:.2}", v)
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .to_string()
            }
        }
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RiskLevel;

    fn fund(name: &str) -> FundRecord {
        FundRecord {
            fund_id: name.to_string(),
            fund_name: name.to_string(),
            fund_house: "SBI".to_string(),
            category: "Debt".to_string(),
            sub_category: None,
            asset_class: None,
            fund_type: None,
            sector: None,
            risk_level: Some(RiskLevel::Low),
            expense_ratio: Some(0.45),
            return_1yr: Some(7.0),
            return_3yr: Some(6.5),
            return_5yr: None,
            aum: None,
            top_holdings: Vec::new(),
            sector_allocation: Vec::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_full_prompt_shape() {
        let a = fund("SBI Magnum Gilt Fund");
        let b = fund("SBI Liquid Fund");
        let c = fund("SBI Corporate Bond Fund");
        let prompt = build_prompt("low risk sbi debt fund", &[&a, &b, &c]);

        assert!(prompt
            .starts_with("You are a mutual fund advisor. A user asked: \"low risk sbi debt fund\"."));
        assert!(prompt.contains("FUND 1: SBI Magnum Gilt Fund"));
        assert!(prompt.contains("FUND 3: SBI Corporate Bond Fund"));
        assert!(prompt.contains("- Returns: 1yr: 7%, 3yr: 6.5%, 5yr: N/A%"));
        assert!(prompt.contains("- Expense Ratio: 0.45%"));
        assert!(prompt.ends_with("Which one is the best match? Explain why in 3 sentences."));
    }

    #[test]
    fn test_missing_slots_render_placeholder() {
        let a = fund("Lone Fund");
        let prompt = build_prompt("anything", &[&a]);
        assert!(prompt.contains("FUND 2: No additional fund data available."));
        assert!(prompt.contains("FUND 3: No additional fund data available."));
    }

    #[test]
    fn test_prompt_is_pure() {
        let a = fund("Fund A");
        assert_eq!(build_prompt("q", &[&a]), build_prompt("q", &[&a]));
    }

    #[test]
    fn test_empty_candidates() {
        let prompt = build_prompt("no matches", &[]);
        assert!(prompt.contains("FUND 1: No additional fund data available."));
    }
}
