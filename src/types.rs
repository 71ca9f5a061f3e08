use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::FULL_TEXT_NOT_FOUND;

/// One news item as discovered by a fetcher. Once a fetcher or the
/// pipeline has run the extractor, `full_text` is either content or the
/// `FULL_TEXT_NOT_FOUND` sentinel; an empty string only occurs for cache
/// entries written before extraction and marks the article for
/// enrichment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    #[serde(default)]
    pub full_text: String,
}

impl Article {
    pub fn has_full_text(&self) -> bool {
        !self.full_text.is_empty() && self.full_text != FULL_TEXT_NOT_FOUND
    }

    /// True when extraction has never been attempted. The sentinel means
    /// it was attempted and failed; that is not retried.
    pub fn needs_extraction(&self) -> bool {
        self.full_text.is_empty()
    }
}

/// Entity buckets produced by the distiller. Serialized with the
/// tagger's short labels so the NLP cache stays readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "ORG")]
    Organization,
    #[serde(rename = "PERSON")]
    Person,
    #[serde(rename = "GPE")]
    Place,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "MONEY")]
    Money,
    #[serde(rename = "PERCENT")]
    Percent,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Organization => "ORG",
            EntityKind::Person => "PERSON",
            EntityKind::Place => "GPE",
            EntityKind::Date => "DATE",
            EntityKind::Money => "MONEY",
            EntityKind::Percent => "PERCENT",
        }
    }
}

/// Condensed representation of one article, owned by it. Never built for
/// an article whose text is the sentinel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessedArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub key_sentences: String,
    pub keywords: Vec<String>,
    pub named_entities: BTreeMap<EntityKind, Vec<String>>,
    pub condensed_text: String,
}

/// Direction of the daily move. Zero classifies as `Loser`; the boundary
/// is preserved from the original behavior and covered by a test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Gainer,
    Loser,
}

impl Movement {
    pub fn classify(daily_change_percentage: f64) -> Self {
        if daily_change_percentage > 0.0 {
            Movement::Gainer
        } else {
            Movement::Loser
        }
    }

    /// Direction word used in prompts and fallback templates.
    pub fn direction(&self) -> &'static str {
        match self {
            Movement::Gainer => "up",
            Movement::Loser => "down",
        }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Movement::Gainer => write!(f, "gainer"),
            Movement::Loser => write!(f, "loser"),
        }
    }
}

/// Terminal artifact of one pipeline run for one symbol. Persisted keyed
/// by symbol and overwritten by later runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoverSummary {
    pub symbol: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub movement: Movement,
    pub period: String,
    pub daily_change_percentage: f64,
    pub summary: String,
    #[serde(default)]
    pub processed_articles: Vec<ProcessedArticle>,
    pub date_generated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_change_is_gainer() {
        assert_eq!(Movement::classify(0.01), Movement::Gainer);
        assert_eq!(Movement::classify(4.2), Movement::Gainer);
    }

    #[test]
    fn negative_change_is_loser() {
        assert_eq!(Movement::classify(-0.01), Movement::Loser);
        assert_eq!(Movement::classify(-7.5), Movement::Loser);
    }

    #[test]
    fn zero_change_classifies_as_loser() {
        // Specified behavior: the sign test treats zero as a loss.
        assert_eq!(Movement::classify(0.0), Movement::Loser);
    }

    #[test]
    fn sentinel_text_is_not_full_text() {
        let article = Article {
            title: "t".into(),
            url: "https://example.com/a".into(),
            published_at: None,
            source: "Test".into(),
            full_text: crate::FULL_TEXT_NOT_FOUND.to_string(),
        };
        assert!(!article.has_full_text());
    }
}
