use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Vocabulary of terms that tend to show up when news moves a price.
/// Matched as lowercase substrings, one point per distinct term.
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "earnings",
    "revenue",
    "profit",
    "loss",
    "guidance",
    "forecast",
    "outlook",
    "dividend",
    "acquisition",
    "merger",
    "buyback",
    "restructuring",
    "layoff",
    "lawsuit",
    "settlement",
    "regulation",
    "investigation",
    "approval",
    "launch",
    "patent",
    "contract",
    "partnership",
    "investment",
    "debt",
    "bankruptcy",
    "downgrade",
    "upgrade",
    "target",
    "rating",
    "analyst",
    "quarterly",
    "annual",
    "growth",
    "decline",
    "beat",
    "miss",
    "exceed",
    "below",
    "above",
    "estimate",
    "expectation",
    "surprise",
    "ceo",
    "executive",
    "management",
    "board",
    "director",
    "shareholder",
    "investor",
    "stake",
    "share",
    "stock",
    "market",
    "trading",
    "volatility",
    "volume",
    "price",
    "valuation",
    "multiple",
    "ratio",
    "eps",
    "p/e",
    "sales",
    "margin",
    "cost",
    "expense",
    "capital",
    "cash",
    "flow",
    "balance",
    "sheet",
    "asset",
    "liability",
];

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d+\.?\d*%?").unwrap();
    static ref CURRENCY_RE: Regex = Regex::new(r"\$\d+\.?\d*|\d+\.?\d*\s+dollars").unwrap();
}

/// Ranks sentences by a fixed relevance heuristic and returns the top
/// `top_n` joined with spaces. Deterministic: equal scores keep original
/// order (the sort is stable).
pub fn extract_key_sentences(text: &str, company_name: &str, ticker: &str, top_n: usize) -> String {
    let company_lower = company_name.to_lowercase();
    let ticker_lower = ticker.to_lowercase();

    let mut scored: Vec<(&str, i32)> = text
        .unicode_sentences()
        .map(|sentence| {
            let lower = sentence.to_lowercase();
            let mut score = 0;

            if !company_lower.is_empty() && lower.contains(&company_lower) {
                score += 3;
            }
            if !ticker_lower.is_empty() && lower.contains(&ticker_lower) {
                score += 2;
            }
            for keyword in FINANCIAL_KEYWORDS {
                if lower.contains(keyword) {
                    score += 1;
                }
            }
            if NUMBER_RE.is_match(sentence) {
                score += 1;
            }
            if CURRENCY_RE.is_match(sentence) {
                score += 2;
            }

            (sentence, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));

    scored
        .iter()
        .take(top_n)
        .map(|(sentence, _)| sentence.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_and_financial_sentences_outrank_filler() {
        let text = "The weather was pleasant in the city today. \
            Acme reported quarterly earnings of $2.10 per share, beating analyst estimates. \
            Local sports results were mixed.";
        let ranked = extract_key_sentences(text, "Acme", "ACME", 1);
        assert!(ranked.contains("quarterly earnings"));
        assert!(!ranked.contains("weather"));
    }

    #[test]
    fn ties_keep_original_order() {
        let text = "First plain sentence here. Second plain sentence here.";
        let ranked = extract_key_sentences(text, "Acme", "ACME", 2);
        let first = ranked.find("First").unwrap();
        let second = ranked.find("Second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn top_n_bounds_output() {
        let text = "One. Two. Three. Four. Five.";
        let ranked = extract_key_sentences(text, "", "", 2);
        assert_eq!(ranked.split(' ').count(), 2);
    }
}
