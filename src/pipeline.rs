//! The `why_it_moves` orchestrator: classification, cached news, text
//! enrichment, distillation, summarization, persistence. Every path
//! yields a `MoverSummary` with a non-empty summary string; degraded
//! conditions surface as canned text, not errors.

use chrono::Utc;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::extract::Extractor;
use crate::limiter::RateLimiter;
use crate::nlp;
use crate::store::Store;
use crate::summarize::SummaryEngine;
use crate::types::{Movement, MoverSummary, ProcessedArticle};
use crate::TARGET_PIPELINE;

/// Articles per analysis run; the cache may hold more.
const MAX_ARTICLES_PER_RUN: usize = 5;
const INTER_ARTICLE_DELAY: Duration = Duration::from_secs(2);
const INTER_SYMBOL_DELAY: Duration = Duration::from_secs(3);

const NO_NEWS_AFFECTING_PRICE: &str =
    "There are no news currently affecting the stock price, fluctuations might be due to market conditions.";
const NO_VALID_SUMMARIES: &str = "No valid article summaries could be generated.";

pub struct Pipeline {
    store: Store,
    extractor: Extractor,
    engine: SummaryEngine,
    scrape_limiter: RateLimiter,
    symbol_limiter: RateLimiter,
}

impl Pipeline {
    pub fn new(store: Store, engine: SummaryEngine) -> Self {
        Self {
            store,
            extractor: Extractor::new(),
            engine,
            scrape_limiter: RateLimiter::new(INTER_ARTICLE_DELAY),
            symbol_limiter: RateLimiter::new(INTER_SYMBOL_DELAY),
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Shrinks pacing, for tests that must not sleep.
    pub fn with_pacing(mut self, inter_article: Duration, inter_symbol: Duration) -> Self {
        self.scrape_limiter = RateLimiter::new(inter_article);
        self.symbol_limiter = RateLimiter::new(inter_symbol);
        self
    }

    /// Explains one symbol's move from its cached news. Idempotent per
    /// symbol given a fixed cache and a deterministic backend; the
    /// result overwrites any previous run's summary.
    pub async fn why_it_moves(
        &mut self,
        symbol: &str,
        exchange: &str,
        daily_change_percentage: f64,
    ) -> MoverSummary {
        let movement = Movement::classify(daily_change_percentage);
        info!(target: TARGET_PIPELINE, "Processing data for symbol: {} - classified as {:?}", symbol, movement);

        // Missing or empty snapshot: no network, no NLP, just the canned
        // text quoting the raw move.
        let mut articles = if self.store.has_news(symbol) {
            self.store.load_news(symbol)
        } else {
            warn!(target: TARGET_PIPELINE, "No news file found for {}", symbol);
            Vec::new()
        };
        if articles.is_empty() {
            let summary_text = format!(
                "No news data available for {symbol}. The stock's movement of \
                 {daily_change_percentage:.2}% may be related to market conditions or \
                 unreported news."
            );
            return self.finish(
                symbol,
                exchange,
                movement,
                daily_change_percentage,
                summary_text,
                Vec::new(),
            );
        }

        // Most recent first; undated articles sort last.
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles.truncate(MAX_ARTICLES_PER_RUN);

        // Enrich articles cached without text. A sentinel from an earlier
        // attempt stays as it is.
        for article in &mut articles {
            if article.needs_extraction() {
                self.scrape_limiter.acquire().await;
                article.full_text = self.extractor.extract(&article.url).await;
            }
        }

        let articles_with_text = articles.iter().filter(|a| a.has_full_text()).count();
        if articles_with_text == 0 {
            info!(target: TARGET_PIPELINE, "All articles for {} have no usable text - skipping summary", symbol);
            return self.finish(
                symbol,
                exchange,
                movement,
                daily_change_percentage,
                NO_NEWS_AFFECTING_PRICE.to_string(),
                Vec::new(),
            );
        }

        let processed = nlp::distill_batch(&articles, symbol, symbol);
        if let Err(err) = self.store.save_nlp_data(symbol, &processed) {
            error!(target: TARGET_PIPELINE, "Failed to save NLP data for {}: {}", symbol, err);
        }

        let direction = movement.direction();
        let mut summaries: Vec<String> = Vec::new();
        for article in &processed {
            if let Some(summary) = self
                .engine
                .summarize_one(&article.condensed_text, symbol, direction)
                .await
            {
                if !summary.trim().is_empty() {
                    summaries.push(summary);
                }
            }
        }

        let summary_text = if summaries.is_empty() {
            info!(target: TARGET_PIPELINE, "No valid summaries generated for {}", symbol);
            NO_VALID_SUMMARIES.to_string()
        } else {
            self.engine.summarize_many(&summaries, symbol).await
        };

        self.finish(
            symbol,
            exchange,
            movement,
            daily_change_percentage,
            summary_text,
            processed,
        )
    }

    /// Processes every symbol with cached news, sequentially, containing
    /// per-symbol problems so one bad symbol never stops the batch.
    pub async fn run_all(&mut self) -> Vec<MoverSummary> {
        let symbols = self.store.news_symbols();
        info!(target: TARGET_PIPELINE, "Found {} stocks with news data", symbols.len());

        let mut results = Vec::new();
        for symbol in symbols {
            self.symbol_limiter.acquire().await;

            let daily_change = self.store.daily_change(&symbol).unwrap_or(0.0);
            // Exchange is not recorded in the news cache; analysis of a
            // cached snapshot does not depend on it.
            let exchange = "NASDAQ";
            info!(target: TARGET_PIPELINE, "Processing {} with change {:.2}%", symbol, daily_change);

            let summary = self.why_it_moves(&symbol, exchange, daily_change).await;
            results.push(summary);
        }
        results
    }

    /// Builds and persists the terminal artifact.
    fn finish(
        &self,
        symbol: &str,
        exchange: &str,
        movement: Movement,
        daily_change_percentage: f64,
        summary: String,
        processed_articles: Vec<ProcessedArticle>,
    ) -> MoverSummary {
        let summary = MoverSummary {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            movement,
            period: "day".to_string(),
            daily_change_percentage,
            summary,
            processed_articles,
            date_generated: Utc::now(),
        };
        match self.store.save_summary(&summary) {
            Ok(()) => {
                info!(target: TARGET_PIPELINE, "{}/{} mover summary saved", exchange, symbol)
            }
            Err(err) => {
                error!(target: TARGET_PIPELINE, "Failed to save summary for {}: {}", symbol, err)
            }
        }
        summary
    }
}
