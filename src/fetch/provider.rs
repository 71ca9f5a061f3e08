use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{parse_date_lenient, within_lookback, FetchContext, MAX_ARTICLES_PER_SOURCE};
use crate::environment::get_optional_env_var;
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

const API_KEY_ENV: &str = "NEWS_PROVIDER_API_KEY";
const API_URL: &str = "https://www.alphavantage.co/query";
/// Ask for more than needed so relevance ranking has something to rank.
const REQUEST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    feed: Vec<ProviderArticle>,
    #[serde(rename = "Note")]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    time_published: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Deserialize)]
struct TickerSentiment {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    relevance_score: String,
    #[serde(default)]
    ticker_sentiment_score: String,
}

impl ProviderArticle {
    /// Per-ticker relevance, falling back to the sentiment score when the
    /// provider omits relevance.
    fn relevance(&self, symbol: &str) -> f64 {
        self.ticker_sentiment
            .iter()
            .find(|sentiment| sentiment.ticker == symbol)
            .map(|sentiment| {
                sentiment
                    .relevance_score
                    .parse()
                    .or_else(|_| sentiment.ticker_sentiment_score.parse())
                    .unwrap_or(0.0)
            })
            .unwrap_or(0.0)
    }
}

/// Provider-API fetcher (news/sentiment endpoint). Needs an API key;
/// without one the source reports empty and the router falls through.
pub async fn fetch_provider_news(ctx: &mut FetchContext, symbol: &str) -> Vec<Article> {
    let api_key = match get_optional_env_var(API_KEY_ENV) {
        Some(key) => key,
        None => {
            info!(target: TARGET_WEB_REQUEST, "News provider API key not set, skipping provider source");
            return Vec::new();
        }
    };

    let limit = REQUEST_LIMIT.to_string();
    let query = [
        ("function", "NEWS_SENTIMENT"),
        ("tickers", symbol),
        ("apikey", api_key.as_str()),
        ("limit", limit.as_str()),
    ];

    let response = match ctx.client.get(API_URL).query(&query).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(target: TARGET_WEB_REQUEST, "Provider API returned status {} for {}", response.status(), symbol);
            return Vec::new();
        }
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Error fetching provider news for {}: {}", symbol, err);
            return Vec::new();
        }
    };

    let data: ProviderResponse = match response.json().await {
        Ok(data) => data,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Error decoding provider response for {}: {}", symbol, err);
            return Vec::new();
        }
    };

    if data.feed.is_empty() {
        if let Some(note) = data.note {
            warn!(target: TARGET_WEB_REQUEST, "Provider API note: {}", note);
        }
        warn!(target: TARGET_WEB_REQUEST, "No news feed in provider response for {}", symbol);
        return Vec::new();
    }

    debug!(target: TARGET_WEB_REQUEST, "Provider feed for {} has {} articles", symbol, data.feed.len());

    let mut ranked = data.feed;
    ranked.sort_by(|a, b| {
        b.relevance(symbol)
            .partial_cmp(&a.relevance(symbol))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let now = Utc::now();
    let mut articles: Vec<Article> = Vec::new();

    for item in ranked {
        if articles.len() >= MAX_ARTICLES_PER_SOURCE {
            break;
        }
        if item.url.is_empty() {
            continue;
        }

        let published_at = match parse_date_lenient(&item.time_published) {
            Some(date) => date,
            None => continue,
        };
        if !within_lookback(&published_at, now) {
            continue;
        }

        ctx.limiter.acquire().await;
        let mut full_text = ctx.extractor.extract(&item.url).await;

        // The provider ships its own abstract; better than the sentinel
        // when the publisher page resists extraction.
        if full_text == crate::FULL_TEXT_NOT_FOUND && !item.summary.trim().is_empty() {
            info!(target: TARGET_WEB_REQUEST, "Using provider summary instead of full text for {}", item.url);
            full_text = item.summary.trim().to_string();
        }

        let article = Article {
            title: if item.title.is_empty() {
                "No title".to_string()
            } else {
                item.title
            },
            url: item.url,
            published_at: Some(published_at),
            source: if item.source.is_empty() {
                "Provider".to_string()
            } else {
                item.source
            },
            full_text,
        };
        if !article.has_full_text() && articles.iter().any(Article::has_full_text) {
            continue;
        }
        articles.push(article);
    }

    info!(target: TARGET_WEB_REQUEST, "Processed {} provider articles for {}", articles.len(), symbol);
    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_prefers_matching_ticker() {
        let article: ProviderArticle = serde_json::from_str(
            r#"{
                "title": "t", "url": "u", "time_published": "20260714T093000",
                "source": "s", "summary": "sum",
                "ticker_sentiment": [
                    {"ticker": "OTHER", "relevance_score": "0.9", "ticker_sentiment_score": "0.1"},
                    {"ticker": "ACME", "relevance_score": "0.4", "ticker_sentiment_score": "0.2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(article.relevance("ACME"), 0.4);
        assert_eq!(article.relevance("MISSING"), 0.0);
    }

    #[test]
    fn relevance_falls_back_to_sentiment_score() {
        let article: ProviderArticle = serde_json::from_str(
            r#"{
                "ticker_sentiment": [
                    {"ticker": "ACME", "relevance_score": "", "ticker_sentiment_score": "0.25"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(article.relevance("ACME"), 0.25);
    }
}
