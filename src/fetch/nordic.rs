use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{parse_date_lenient, within_lookback, FetchContext, MAX_ARTICLES_PER_SOURCE};
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

const NEWS_API_URL: &str = "https://api.news.eu.nasdaq.com/news/query.action";
const JSONP_CALLBACK: &str = "companyNews.callback";

/// Nordic/Baltic fetcher against the Nasdaq exchange-notice API. The
/// caller must have resolved the issuer id; without one this source
/// cannot be queried at all.
pub async fn fetch_nordic_news(
    ctx: &mut FetchContext,
    symbol: &str,
    issuer_id: &str,
) -> Vec<Article> {
    let query = [
        ("callback", JSONP_CALLBACK),
        ("type", "json"),
        ("globalGroup", "exchangeNotice"),
        ("globalName", "MicrositeFilter"),
        ("showAttachments", "true"),
        ("showCnsSpecific", "true"),
        ("showCompany", "true"),
        ("displayLanguage", "en"),
        ("dateMask", "yyyy-MM-dd HH:mm:ss"),
        ("timeZone", "CET"),
        ("gcfIssuerId", issuer_id),
    ];

    let body = match ctx.client.get(NEWS_API_URL).query(&query).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to read exchange-notice body for {}: {}", symbol, err);
                return Vec::new();
            }
        },
        Ok(response) => {
            warn!(target: TARGET_WEB_REQUEST, "Exchange-notice API returned {} for {}", response.status(), symbol);
            return Vec::new();
        }
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Error fetching exchange notices for {}: {}", symbol, err);
            return Vec::new();
        }
    };

    let payload = match unwrap_jsonp(&body) {
        Some(payload) => payload,
        None => {
            warn!(target: TARGET_WEB_REQUEST, "Exchange-notice response for {} is not JSONP", symbol);
            return Vec::new();
        }
    };
    let data: Value = match serde_json::from_str(payload) {
        Ok(data) => data,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Error decoding exchange notices for {}: {}", symbol, err);
            return Vec::new();
        }
    };

    let items = match data
        .get("results")
        .and_then(|results| results.get("item"))
        .and_then(Value::as_array)
    {
        Some(items) => items,
        None => {
            warn!(target: TARGET_WEB_REQUEST, "No news items found for {}", symbol);
            return Vec::new();
        }
    };

    let now = Utc::now();
    let mut articles: Vec<Article> = Vec::new();

    for item in items {
        if articles.len() >= MAX_ARTICLES_PER_SOURCE {
            break;
        }

        let url = match item.get("messageUrl").and_then(Value::as_str) {
            Some(url) => url.to_string(),
            None => continue,
        };
        let title = item
            .get("headline")
            .and_then(Value::as_str)
            .unwrap_or("No title")
            .to_string();
        let published_at = match item
            .get("published")
            .and_then(Value::as_str)
            .and_then(parse_date_lenient)
        {
            Some(date) => date,
            None => {
                debug!(target: TARGET_WEB_REQUEST, "Notice for {} has no parsable date, skipping", symbol);
                continue;
            }
        };
        if !within_lookback(&published_at, now) {
            continue;
        }

        ctx.limiter.acquire().await;
        let full_text = ctx.extractor.extract(&url).await;

        let article = Article {
            title,
            url,
            published_at: Some(published_at),
            source: "Nasdaq Nordic".to_string(),
            full_text,
        };
        if !article.has_full_text() && articles.iter().any(Article::has_full_text) {
            debug!(target: TARGET_WEB_REQUEST, "Skipping textless notice {}", article.url);
            continue;
        }
        articles.push(article);
    }

    info!(target: TARGET_WEB_REQUEST, "Found {} exchange notices for {}", articles.len(), symbol);
    articles
}

/// The API answers `companyNews.callback({...});` even when asked for
/// JSON, so the payload has to be cut out of the callback wrapper.
fn unwrap_jsonp(body: &str) -> Option<&str> {
    let start = body.find('(')? + 1;
    let end = body.rfind(')')?;
    (start <= end).then(|| &body[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_callback_payload() {
        let body = r#"companyNews.callback({"results":{"item":[]}});"#;
        assert_eq!(unwrap_jsonp(body), Some(r#"{"results":{"item":[]}}"#));
    }

    #[test]
    fn plain_garbage_is_rejected() {
        assert!(unwrap_jsonp("service unavailable").is_none());
    }
}
