use super::yahoo::fetch_from_rss;
use super::{FetchContext, MAX_ARTICLES_PER_SOURCE};
use crate::types::Article;

/// European fetcher: the Yahoo RSS chain against the EU edition of the
/// feed. Unlike the US fallback, textless articles are skipped once a
/// text-bearing one has been found.
pub async fn fetch_european_news(ctx: &mut FetchContext, symbol: &str) -> Vec<Article> {
    let feed_url = format!(
        "https://feeds.finance.yahoo.com/rss/2.0/headline?s={symbol}&region=EU&lang=en-GB"
    );
    fetch_from_rss(
        ctx,
        symbol,
        &feed_url,
        "Yahoo Finance",
        MAX_ARTICLES_PER_SOURCE,
        false,
    )
    .await
}
