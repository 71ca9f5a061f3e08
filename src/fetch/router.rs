use std::collections::HashSet;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use super::{european, is_english, nordic, provider, us, yahoo, FetchContext, Source};
use crate::store::Store;
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

const INTER_SOURCE_DELAY: Duration = Duration::from_secs(2);

const US_CHAIN: &[Source] = &[Source::Provider, Source::UsScraper, Source::YahooRss];
const EU_CHAIN: &[Source] = &[Source::European];
const NORDIC_BALTIC_CHAIN: &[Source] = &[Source::NordicBaltic];

/// Maps an exchange code to its fetcher chain. Unknown codes get the US
/// chain.
fn chain_for_exchange(exchange: &str) -> &'static [Source] {
    match exchange.to_uppercase().as_str() {
        "US" | "NYSE" | "NASDAQ" | "AMEX" => US_CHAIN,
        "EU" | "EURONEXT" | "XETRA" | "LSE" => EU_CHAIN,
        "NORDIC" | "OMXH" | "OMXS" | "OMXC" => NORDIC_BALTIC_CHAIN,
        "BALTIC" | "OMXT" | "OMXR" | "OMXV" => NORDIC_BALTIC_CHAIN,
        other => {
            warn!(target: TARGET_WEB_REQUEST, "Unknown exchange {}, defaulting to US chain", other);
            US_CHAIN
        }
    }
}

/// Runs the fetcher chain for `(symbol, exchange)` in priority order,
/// stopping at the first source that yields at least one article.
/// Non-English titles are dropped and duplicate URLs across sources
/// collapse to the first occurrence.
pub async fn route(
    ctx: &mut FetchContext,
    store: &Store,
    symbol: &str,
    exchange: &str,
) -> Vec<Article> {
    let chain = chain_for_exchange(exchange);
    let mut articles: Vec<Article> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for (position, source) in chain.iter().enumerate() {
        if position > 0 {
            sleep(INTER_SOURCE_DELAY).await;
        }
        info!(target: TARGET_WEB_REQUEST, "Fetching {} news for {} from {}", exchange, symbol, source.label());

        let fetched = match source {
            Source::Provider => provider::fetch_provider_news(ctx, symbol).await,
            Source::UsScraper => us::fetch_us_news(ctx, symbol).await,
            Source::YahooRss => yahoo::fetch_yahoo_news(ctx, symbol).await,
            Source::European => european::fetch_european_news(ctx, symbol).await,
            Source::NordicBaltic => {
                // Precondition: the issuer id must resolve, otherwise this
                // source is skipped rather than treated as an error.
                match store.issuer_id(symbol) {
                    Some(issuer_id) => nordic::fetch_nordic_news(ctx, symbol, &issuer_id).await,
                    None => {
                        info!(target: TARGET_WEB_REQUEST, "No issuer id for {}, skipping {}", symbol, source.label());
                        continue;
                    }
                }
            }
        };

        for article in fetched {
            if !is_english(&article.title) {
                info!(target: TARGET_WEB_REQUEST, "Skipping non-English article for {}: {}", symbol, article.title);
                continue;
            }
            if !seen_urls.insert(article.url.clone()) {
                continue;
            }
            articles.push(article);
        }

        if !articles.is_empty() {
            break;
        }
    }

    if articles.is_empty() {
        warn!(target: TARGET_WEB_REQUEST, "No news articles found for {}", symbol);
    }
    articles
}

/// Routes and persists the snapshot so analysis runs can work offline.
pub async fn fetch_and_cache(
    ctx: &mut FetchContext,
    store: &Store,
    symbol: &str,
    exchange: &str,
) -> Vec<Article> {
    let articles = route(ctx, store, symbol, exchange).await;
    if !articles.is_empty() {
        if let Err(err) = store.save_news(symbol, &articles) {
            warn!(target: TARGET_WEB_REQUEST, "Failed to save news snapshot for {}: {}", symbol, err);
        } else {
            info!(target: TARGET_WEB_REQUEST, "Saved {} news articles for {}", articles.len(), symbol);
        }
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_families_map_to_expected_chains() {
        assert_eq!(chain_for_exchange("NASDAQ"), US_CHAIN);
        assert_eq!(chain_for_exchange("nyse"), US_CHAIN);
        assert_eq!(chain_for_exchange("LSE"), EU_CHAIN);
        assert_eq!(chain_for_exchange("OMXH"), NORDIC_BALTIC_CHAIN);
        assert_eq!(chain_for_exchange("OMXT"), NORDIC_BALTIC_CHAIN);
    }

    #[test]
    fn unknown_exchange_defaults_to_us_chain() {
        assert_eq!(chain_for_exchange("MOON"), US_CHAIN);
    }
}
