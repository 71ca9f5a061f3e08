use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Words that carry no keyword value on their own and delimit candidate
/// phrases.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more",
    "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "out", "over", "own", "said", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];

const MAX_PHRASE_WORDS: usize = 2;

static STOPWORD_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STOPWORDS.iter().copied().collect());

fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

/// Keyword extraction: a degree-over-frequency phrase ranker first, with
/// a plain frequency count as the fallback when the ranker produces
/// nothing (degenerate input).
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    if text.is_empty() || text == crate::FULL_TEXT_NOT_FOUND {
        return Vec::new();
    }
    let ranked = ranked_phrases(text, max_keywords);
    if !ranked.is_empty() {
        return ranked;
    }
    frequency_keywords(text, max_keywords)
}

/// RAKE-style ranking: candidate phrases are stopword-delimited runs of
/// alphabetic words (clipped to bigrams); each word scores
/// degree/frequency over the candidate set and a phrase scores the sum
/// of its words. Near-duplicate phrases collapse at stem level.
fn ranked_phrases(text: &str, max_keywords: usize) -> Vec<String> {
    let candidates = candidate_phrases(text);
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut frequency: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();
    for phrase in &candidates {
        for word in phrase {
            *frequency.entry(word.as_str()).or_insert(0.0) += 1.0;
            *degree.entry(word.as_str()).or_insert(0.0) += phrase.len() as f64;
        }
    }

    let mut scored: Vec<(String, f64)> = candidates
        .iter()
        .map(|phrase| {
            let score = phrase
                .iter()
                .map(|word| degree[word.as_str()] / frequency[word.as_str()])
                .sum();
            (phrase.join(" "), score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let stemmer = Stemmer::create(Algorithm::English);
    let mut seen_stems: HashSet<String> = HashSet::new();
    let mut seen_phrases: HashSet<String> = HashSet::new();
    let mut keywords = Vec::new();

    for (phrase, _) in scored {
        if keywords.len() >= max_keywords {
            break;
        }
        let stem_key = phrase
            .split(' ')
            .map(|word| stemmer.stem(word).into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        if !seen_phrases.insert(phrase.clone()) || !seen_stems.insert(stem_key) {
            continue;
        }
        keywords.push(phrase);
    }
    keywords
}

fn candidate_phrases(text: &str) -> Vec<Vec<String>> {
    let mut phrases = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for word in text.unicode_words() {
        let lower = word.to_lowercase();
        let alphabetic = lower.chars().all(char::is_alphabetic);
        if !alphabetic || is_stopword(&lower) {
            if !current.is_empty() {
                phrases.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(lower);
        if current.len() == MAX_PHRASE_WORDS {
            phrases.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        phrases.push(current);
    }
    phrases
}

/// Frequency fallback: most common alphabetic non-stopword tokens,
/// ties broken by first appearance.
fn frequency_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (position, word) in text.unicode_words().enumerate() {
        let lower = word.to_lowercase();
        if !lower.chars().all(char::is_alphabetic) || is_stopword(&lower) {
            continue;
        }
        *counts.entry(lower.clone()).or_insert(0) += 1;
        first_seen.entry(lower).or_insert(position);
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|(word, count)| (std::cmp::Reverse(*count), first_seen[word]));
    ranked
        .into_iter()
        .take(max_keywords)
        .map(|(word, _)| word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_empty_yield_no_keywords() {
        assert!(extract_keywords("", 10).is_empty());
        assert!(extract_keywords(crate::FULL_TEXT_NOT_FOUND, 10).is_empty());
    }

    #[test]
    fn repeated_phrases_rank_high() {
        let text = "Strong earnings growth drove the rally. Analysts cited earnings growth \
            and margin expansion. Earnings growth was the theme of the quarter.";
        let keywords = extract_keywords(text, 5);
        assert!(keywords.iter().any(|kw| kw.contains("earnings")));
    }

    #[test]
    fn stem_level_duplicates_collapse() {
        let text = "shares rally as share rallies continue";
        let keywords = extract_keywords(text, 10);
        let stems: Vec<_> = keywords
            .iter()
            .filter(|kw| kw.starts_with("share"))
            .collect();
        // "shares rally" and "share rallies" stem to the same key.
        assert!(stems.len() <= 1, "got {keywords:?}");
    }

    #[test]
    fn frequency_fallback_orders_by_count_then_position() {
        let keywords = frequency_keywords("beta alpha beta gamma alpha beta", 2);
        assert_eq!(keywords, vec!["beta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn output_is_deterministic() {
        let text = "Acme expands production capacity after record demand for widgets, \
            record demand pushed margins higher.";
        assert_eq!(extract_keywords(text, 5), extract_keywords(text, 5));
    }
}
