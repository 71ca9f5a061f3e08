//! Distills raw article text into the condensed representation the
//! summarization engine consumes.

use tracing::debug;

use crate::types::{Article, EntityKind, ProcessedArticle};
use crate::TARGET_PIPELINE;

pub mod entities;
pub mod keywords;
pub mod sentences;

const TOP_SENTENCES: usize = 10;
const MAX_KEYWORDS: usize = 10;
/// At most this many entities of each kind make it into the digest.
const MAX_ENTITIES_PER_KIND: usize = 5;

/// Entity kinds worth surfacing to the summarizer, in digest order.
const DIGEST_ENTITY_KINDS: &[EntityKind] = &[
    EntityKind::Organization,
    EntityKind::Person,
    EntityKind::Place,
    EntityKind::Money,
    EntityKind::Percent,
    EntityKind::Date,
];

/// Produces the condensed representation for one article, or `None` when
/// the article carries no usable text.
pub fn distill(article: &Article, company_name: &str, ticker: &str) -> Option<ProcessedArticle> {
    if !article.has_full_text() {
        return None;
    }
    let text = &article.full_text;

    let key_sentences = sentences::extract_key_sentences(text, company_name, ticker, TOP_SENTENCES);
    let named_entities = entities::extract_named_entities(text);
    let keywords = keywords::extract_keywords(text, MAX_KEYWORDS);

    let mut condensed_text = format!("Title: {}\n\n", article.title);
    condensed_text.push_str(&format!("Key information: {key_sentences}\n\n"));

    if !named_entities.is_empty() {
        condensed_text.push_str("Named entities:\n");
        for kind in DIGEST_ENTITY_KINDS {
            if let Some(values) = named_entities.get(kind) {
                let capped: Vec<&str> = values
                    .iter()
                    .take(MAX_ENTITIES_PER_KIND)
                    .map(String::as_str)
                    .collect();
                condensed_text.push_str(&format!("- {}: {}\n", kind.label(), capped.join(", ")));
            }
        }
    }
    if !keywords.is_empty() {
        condensed_text.push_str(&format!("Keywords: {}\n", keywords.join(", ")));
    }

    debug!(target: TARGET_PIPELINE, "Distilled {} into {} chars", article.url, condensed_text.len());

    Some(ProcessedArticle {
        title: article.title.clone(),
        url: article.url.clone(),
        published_at: article.published_at,
        key_sentences,
        keywords,
        named_entities,
        condensed_text,
    })
}

/// Distills a batch, silently dropping articles without usable text.
pub fn distill_batch(
    articles: &[Article],
    company_name: &str,
    ticker: &str,
) -> Vec<ProcessedArticle> {
    articles
        .iter()
        .filter_map(|article| distill(article, company_name, ticker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FULL_TEXT_NOT_FOUND;

    fn article(full_text: &str) -> Article {
        Article {
            title: "Acme shares surge on earnings".into(),
            url: "https://example.com/acme".into(),
            published_at: None,
            source: "Test".into(),
            full_text: full_text.into(),
        }
    }

    #[test]
    fn sentinel_article_is_not_distilled() {
        assert!(distill(&article(FULL_TEXT_NOT_FOUND), "Acme", "ACME").is_none());
        assert!(distill(&article(""), "Acme", "ACME").is_none());
    }

    #[test]
    fn condensed_text_carries_title_entities_and_keywords() {
        let processed = distill(
            &article(
                "Acme Corp reported quarterly earnings of $2.10 per share, up 15% from last year. \
                 CEO Jane Smith raised full-year guidance for Acme Corp.",
            ),
            "Acme",
            "ACME",
        )
        .unwrap();

        assert!(processed.condensed_text.starts_with("Title: Acme shares surge"));
        assert!(processed.condensed_text.contains("Key information:"));
        assert!(processed.condensed_text.contains("- ORG:"));
        assert!(processed.condensed_text.contains("- PERSON: Jane Smith"));
        assert!(processed.condensed_text.contains("Keywords:"));
        assert!(!processed.keywords.is_empty());
    }

    #[test]
    fn batch_drops_only_textless_articles() {
        let articles = vec![
            article("Acme Corp won a large defense contract worth $3 billion over five years."),
            article(FULL_TEXT_NOT_FOUND),
        ];
        let processed = distill_batch(&articles, "ACME", "ACME");
        assert_eq!(processed.len(), 1);
    }
}
