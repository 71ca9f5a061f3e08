use chrono::{DateTime, Utc};
use feed_rs::parser;
use scraper::{Html, Selector};
use std::io::Cursor;
use tracing::{debug, info, warn};

use super::{parse_date_lenient, within_lookback, FetchContext, MAX_ARTICLES_HIGH_RECALL};
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

/// Yahoo Finance RSS fetcher. Last link in the US chain and the one with
/// the loosest standards: it keeps articles even when extraction comes
/// back with the sentinel, so the pipeline always has something to work
/// with.
pub async fn fetch_yahoo_news(ctx: &mut FetchContext, symbol: &str) -> Vec<Article> {
    let feed_url = format!(
        "https://feeds.finance.yahoo.com/rss/2.0/headline?s={symbol}&region=US&lang=en-US"
    );
    fetch_from_rss(
        ctx,
        symbol,
        &feed_url,
        "Yahoo Finance",
        MAX_ARTICLES_HIGH_RECALL,
        true,
    )
    .await
}

/// Shared RSS-discovery path: pull the feed, keep recent entries, enrich
/// each through the extractor. When `keep_unextracted` is false,
/// sentinel-text articles are dropped once a text-bearing one exists.
pub(super) async fn fetch_from_rss(
    ctx: &mut FetchContext,
    symbol: &str,
    feed_url: &str,
    source: &str,
    cap: usize,
    keep_unextracted: bool,
) -> Vec<Article> {
    let body = match ctx.client.get(feed_url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to read feed body for {}: {}", symbol, err);
                return Vec::new();
            }
        },
        Ok(response) => {
            warn!(target: TARGET_WEB_REQUEST, "Feed request for {} returned {}", symbol, response.status());
            return Vec::new();
        }
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Feed request for {} failed: {}", symbol, err);
            return Vec::new();
        }
    };

    let feed = match parser::parse(Cursor::new(body)) {
        Ok(feed) => feed,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Failed to parse feed for {}: {}", symbol, err);
            return Vec::new();
        }
    };

    debug!(target: TARGET_WEB_REQUEST, "Feed for {} has {} entries", symbol, feed.entries.len());

    let now = Utc::now();
    let mut articles: Vec<Article> = Vec::new();

    for entry in feed.entries {
        if articles.len() >= cap {
            break;
        }

        let url = match entry.links.first().map(|link| link.href.clone()) {
            Some(url) => url,
            None => {
                debug!(target: TARGET_WEB_REQUEST, "Feed entry missing link, skipping");
                continue;
            }
        };
        let published_at = match entry.published {
            Some(date) => date.with_timezone(&Utc),
            // Undated feed entries get one page probe for a `time` tag;
            // still undated means the recency filter cannot pass.
            None => {
                ctx.limiter.acquire().await;
                match page_published_date(ctx, &url).await {
                    Some(date) => date,
                    None => {
                        debug!(target: TARGET_WEB_REQUEST, "Entry {} has no publication date, skipping", url);
                        continue;
                    }
                }
            }
        };
        if !within_lookback(&published_at, now) {
            continue;
        }
        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "No title".to_string());

        ctx.limiter.acquire().await;
        let full_text = ctx.extractor.extract(&url).await;

        let article = Article {
            title,
            url,
            published_at: Some(published_at),
            source: source.to_string(),
            full_text,
        };

        if !article.has_full_text()
            && !keep_unextracted
            && articles.iter().any(Article::has_full_text)
        {
            debug!(target: TARGET_WEB_REQUEST, "Skipping textless article {}", article.url);
            continue;
        }
        articles.push(article);
    }

    info!(target: TARGET_WEB_REQUEST, "Found {} articles from {} for {}", articles.len(), source, symbol);
    articles
}

async fn page_published_date(ctx: &FetchContext, url: &str) -> Option<DateTime<Utc>> {
    let body = ctx
        .client
        .get(url)
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .text()
        .await
        .ok()?;
    published_from_html(&body)
}

/// Publication date from the first `time` tag carrying a `datetime`
/// attribute.
fn published_from_html(body: &str) -> Option<DateTime<Utc>> {
    let doc = Html::parse_document(body);
    let sel = Selector::parse("time[datetime]").ok()?;
    let datetime = doc.select(&sel).next()?.value().attr("datetime")?;
    parse_date_lenient(datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_tag_yields_the_publication_date() {
        let body = r#"<html><body><article>
            <time datetime="2026-07-14T09:30:00Z">July 14</time>
            <p>Body text.</p></article></body></html>"#;
        let parsed = published_from_html(body).unwrap();
        assert_eq!(parsed, parse_date_lenient("2026-07-14T09:30:00Z").unwrap());
    }

    #[test]
    fn pages_without_a_time_tag_stay_undated() {
        assert!(published_from_html("<html><body><p>no dates here</p></body></html>").is_none());
    }
}
