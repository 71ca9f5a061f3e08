//! Two-stage summarization with sticky degradation: per-article
//! explanations, then a fused narrative, falling back to fixed templates
//! whenever the generation backend is missing or broken.

use std::collections::HashSet;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::limiter::RateLimiter;
use crate::TARGET_LLM_REQUEST;

pub mod backend;
pub mod prompts;

pub use backend::{BackendError, GenerationBackend, RulesGenerator};

const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const BACKEND_CALL_INTERVAL: Duration = Duration::from_secs(2);

/// Sentences containing these read as padding and are filtered from the
/// fused narrative.
const VAGUE_PHRASES: &[&str] = &["several factors", "combination of factors", "various factors"];

/// Two sentences sharing more than this fraction of the smaller one's
/// tokens are duplicates.
const DUPLICATE_OVERLAP: f64 = 0.8;

pub struct SummaryEngine {
    backend: Option<GenerationBackend>,
    /// Cleared once by an auth-class failure; never re-set within a
    /// session.
    backend_healthy: bool,
    temperature: f32,
    limiter: RateLimiter,
    max_retries: usize,
    initial_backoff: Duration,
}

impl SummaryEngine {
    pub fn new(backend: Option<GenerationBackend>) -> Self {
        Self {
            backend,
            backend_healthy: true,
            temperature: 0.3,
            limiter: RateLimiter::new(BACKEND_CALL_INTERVAL),
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    pub fn from_environment() -> Self {
        let temperature = crate::environment::get_env_var_as("LLM_TEMPERATURE", 0.3f32);
        Self::new(GenerationBackend::from_environment()).with_temperature(temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Shrinks pacing and retries, for tests that must not sleep.
    pub fn with_pacing(mut self, call_interval: Duration, initial_backoff: Duration) -> Self {
        self.limiter = RateLimiter::new(call_interval);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn backend_healthy(&self) -> bool {
        self.backend_healthy
    }

    /// True when every call will take the template path.
    pub fn uses_fallback(&self) -> bool {
        self.backend.is_none() || !self.backend_healthy
    }

    /// Per-article stage. `None` only for empty input; generation
    /// failures degrade to the article template instead.
    pub async fn summarize_one(
        &mut self,
        condensed_text: &str,
        symbol: &str,
        direction: &str,
    ) -> Option<String> {
        if condensed_text.trim().is_empty() || condensed_text == crate::FULL_TEXT_NOT_FOUND {
            return None;
        }
        let prompt = prompts::article_prompt(condensed_text, symbol, direction);
        match self.generate_with_retry(&prompt).await {
            Some(text) => Some(text),
            None => Some(fallback_article_summary(symbol, direction)),
        }
    }

    /// Aggregate stage: fuses per-article explanations into one
    /// narrative, compacts it when a backend is available, then filters
    /// filler and near-duplicate sentences. Never returns an empty
    /// string.
    pub async fn summarize_many(&mut self, summaries: &[String], symbol: &str) -> String {
        let valid: Vec<String> = summaries
            .iter()
            .filter(|summary| !summary.trim().is_empty())
            .cloned()
            .collect();
        if valid.is_empty() {
            return "No valid summaries to combine.".to_string();
        }

        let prompt = prompts::fusion_prompt(&valid, symbol);
        let fused = match self.generate_with_retry(&prompt).await {
            Some(text) => {
                // Best-effort compaction; failure keeps the longer text.
                let compaction = prompts::compaction_prompt(&text);
                match self.generate_with_retry(&compaction).await {
                    Some(compacted) => compacted,
                    None => text,
                }
            }
            None => fallback_fused_summary(symbol),
        };

        let cleaned = dedupe_sentences(&filter_vague_sentences(&fused));
        if cleaned.trim().is_empty() {
            fallback_fused_summary(symbol)
        } else {
            cleaned
        }
    }

    /// Bounded-retry generation honoring the sticky health flag. `None`
    /// means the caller should use its template.
    async fn generate_with_retry(&mut self, prompt: &str) -> Option<String> {
        let backend = self.backend.clone()?;
        if !self.backend_healthy {
            return None;
        }

        let mut backoff = self.initial_backoff;
        for attempt in 0..self.max_retries {
            self.limiter.acquire().await;
            match backend.generate(prompt, self.temperature).await {
                Ok(text) if !text.trim().is_empty() => return Some(text.trim().to_string()),
                Ok(_) => {
                    warn!(target: TARGET_LLM_REQUEST, "Empty response from backend (attempt {}/{})", attempt + 1, self.max_retries);
                }
                Err(BackendError::Auth(msg)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Auth failure, switching to fallback for this session: {}", msg);
                    self.backend_healthy = false;
                    return None;
                }
                Err(BackendError::RateLimited(msg)) => {
                    info!(target: TARGET_LLM_REQUEST, "Rate limited (attempt {}/{}): {}", attempt + 1, self.max_retries, msg);
                }
                Err(BackendError::Transient(msg)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error in generation request (attempt {}/{}): {}", attempt + 1, self.max_retries, msg);
                }
            }

            if attempt < self.max_retries - 1 {
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        error!(target: TARGET_LLM_REQUEST, "Failed to generate text after {} attempts", self.max_retries);
        None
    }
}

fn fallback_article_summary(symbol: &str, direction: &str) -> String {
    format!(
        "The news provides relevant information about {symbol}'s business operations, market \
         positioning, and potential catalysts that could explain why the stock is moving \
         {direction}. Key factors include industry trends, financial performance, and investor \
         sentiment."
    )
}

fn fallback_fused_summary(symbol: &str) -> String {
    format!(
        "Based on recent news about {symbol}, the stock movement appears to be driven by \
         market conditions, sector trends, and company-specific developments. Investor \
         sentiment and trading patterns may also be contributing factors."
    )
}

/// Drops whole sentences containing vague filler phrases.
fn filter_vague_sentences(text: &str) -> String {
    text.unicode_sentences()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            !VAGUE_PHRASES.iter().any(|phrase| lower.contains(phrase))
        })
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_set(sentence: &str) -> HashSet<String> {
    sentence
        .unicode_words()
        .map(str::to_lowercase)
        .collect()
}

/// Collapses near-duplicate sentences: more than 80% token overlap over
/// the smaller set, or full containment, keeps only the first.
pub fn dedupe_sentences(text: &str) -> String {
    let mut kept: Vec<(&str, HashSet<String>)> = Vec::new();

    for sentence in text.unicode_sentences() {
        let tokens = token_set(sentence);
        if tokens.is_empty() {
            continue;
        }
        let duplicate = kept.iter().any(|(_, existing)| {
            let intersection = existing.intersection(&tokens).count();
            let smaller = existing.len().min(tokens.len());
            let overlap = intersection as f64 / smaller as f64;
            overlap > DUPLICATE_OVERLAP
                || tokens.is_subset(existing)
                || existing.is_subset(&tokens)
        });
        if !duplicate {
            kept.push((sentence, tokens));
        }
    }

    kept.iter()
        .map(|(sentence, _)| sentence.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn no_backend_uses_article_template() {
        let mut engine = SummaryEngine::new(None);
        let summary = engine
            .summarize_one("Title: Acme wins contract", "ACME", "up")
            .await
            .unwrap();
        assert!(summary.contains("ACME"));
        assert!(summary.contains("moving up"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_condensed_text_yields_none() {
        let mut engine = SummaryEngine::new(None);
        assert!(engine.summarize_one("", "ACME", "up").await.is_none());
        assert!(engine
            .summarize_one(crate::FULL_TEXT_NOT_FOUND, "ACME", "down")
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn no_valid_summaries_is_reported() {
        let mut engine = SummaryEngine::new(None);
        let fused = engine
            .summarize_many(&["".to_string(), "  ".to_string()], "ACME")
            .await;
        assert_eq!(fused, "No valid summaries to combine.");
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_fused_summary_references_symbol() {
        let mut engine = SummaryEngine::new(None);
        let fused = engine
            .summarize_many(&["Acme beat earnings estimates.".to_string()], "ACME")
            .await;
        assert!(fused.contains("ACME"));
        assert!(!fused.trim().is_empty());
    }

    #[test]
    fn vague_sentences_are_filtered() {
        let text = "Acme beat earnings estimates. \
            The move reflects a combination of factors. Guidance was raised.";
        let filtered = filter_vague_sentences(text);
        assert!(!filtered.contains("combination of factors"));
        assert!(filtered.contains("Guidance was raised"));
    }

    #[test]
    fn near_duplicate_sentences_collapse() {
        let text = "Acme shares rose after strong quarterly earnings were reported. \
            Acme shares rose after strong quarterly earnings were announced. \
            A new product line launches next month.";
        let deduped = dedupe_sentences(text);
        assert_eq!(deduped.matches("Acme shares rose").count(), 1);
        assert!(deduped.contains("new product line"));
    }

    #[test]
    fn subset_sentences_collapse() {
        let text = "Acme raised guidance. Acme raised guidance again this quarter.";
        let deduped = dedupe_sentences(text);
        assert_eq!(deduped, "Acme raised guidance.");
    }

    #[tokio::test(start_paused = true)]
    async fn rules_backend_is_deterministic() {
        let mut engine = SummaryEngine::new(Some(GenerationBackend::Rules(RulesGenerator)))
            .with_pacing(Duration::ZERO, Duration::ZERO);
        let condensed = "Title: Acme\n\nKey information: Acme reported record earnings and \
            raised guidance for the full year.";
        let first = engine.summarize_one(condensed, "ACME", "up").await;
        let second = engine.summarize_one(condensed, "ACME", "up").await;
        assert_eq!(first, second);
        assert!(first.unwrap().contains("earnings"));
    }
}
