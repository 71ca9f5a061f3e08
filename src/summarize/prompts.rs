//! Prompt builders for the summarization backend. Structured arguments
//! go in here; nothing downstream ever parses a prompt back apart.

/// Bounded input for the compaction pass; anything longer is truncated
/// at a char boundary.
const MAX_COMPACTION_INPUT_CHARS: usize = 4000;

/// Per-article stage: explain one condensed digest against the observed
/// direction.
pub fn article_prompt(condensed_text: &str, symbol: &str, direction: &str) -> String {
    format!(
        "Analyze this processed news information about {symbol} stock and explain how it \
         might relate to the stock moving {direction}. Focus on key factors that could \
         influence stock price.\n\nProcessed information: {condensed_text}"
    )
}

/// Aggregate stage: fuse the per-article explanations into one narrative.
pub fn fusion_prompt(summaries: &[String], symbol: &str) -> String {
    format!(
        "Based on these news summaries about {symbol}, provide a concise explanation of \
         why the stock might be moving:\n\n{}",
        summaries.join(" ")
    )
}

/// Optional compaction pass over the fused narrative, bounded on both
/// ends.
pub fn compaction_prompt(text: &str) -> String {
    let bounded: String = text.chars().take(MAX_COMPACTION_INPUT_CHARS).collect();
    format!(
        "Condense the following explanation of a stock move into a single paragraph of \
         between 60 and 100 words, keeping every concrete fact and dropping generic \
         filler:\n\n{bounded}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_structured_arguments() {
        let prompt = article_prompt("Title: x", "ACME", "up");
        assert!(prompt.contains("ACME stock"));
        assert!(prompt.contains("moving up"));
        assert!(prompt.contains("Title: x"));
    }

    #[test]
    fn compaction_input_is_bounded() {
        let long = "word ".repeat(5000);
        let prompt = compaction_prompt(&long);
        assert!(prompt.chars().count() < MAX_COMPACTION_INPUT_CHARS + 300);
    }
}
