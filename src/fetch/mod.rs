//! Source-specific news fetchers and the exchange router.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tokio::time::Duration;
use tracing::debug;

use crate::extract::Extractor;
use crate::limiter::RateLimiter;
use crate::TARGET_WEB_REQUEST;

pub mod european;
pub mod nordic;
pub mod provider;
pub mod router;
pub mod us;
pub mod yahoo;

/// Articles older than this are noise for a daily-move explanation.
pub const LOOKBACK_DAYS: i64 = 30;

/// Default cap on articles per fetcher; the highest-recall source may go
/// up to [`MAX_ARTICLES_HIGH_RECALL`].
pub const MAX_ARTICLES_PER_SOURCE: usize = 3;
pub const MAX_ARTICLES_HIGH_RECALL: usize = 6;

const INTER_ARTICLE_DELAY: Duration = Duration::from_secs(2);

/// The fetchers the router can sequence, in no particular order here;
/// priority is the router's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Provider,
    UsScraper,
    YahooRss,
    European,
    NordicBaltic,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Provider => "provider",
            Source::UsScraper => "us-scraper",
            Source::YahooRss => "yahoo-rss",
            Source::European => "european",
            Source::NordicBaltic => "nordic-baltic",
        }
    }
}

/// Shared plumbing handed to every fetcher: one HTTP client, the text
/// extractor, and the per-scrape-target pacing limiter.
pub struct FetchContext {
    pub client: reqwest::Client,
    pub extractor: Extractor,
    pub limiter: RateLimiter,
}

impl FetchContext {
    pub fn new() -> Self {
        Self::with_article_delay(INTER_ARTICLE_DELAY)
    }

    pub fn with_article_delay(delay: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            )
            .timeout(Duration::from_secs(10))
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            extractor: Extractor::new(),
            limiter: RateLimiter::new(delay),
        }
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lenient date parsing over the formats the sources actually emit,
/// normalized to UTC. Naive stamps are assumed UTC; failures yield
/// `None` and the article is filtered out rather than crashing a batch.
pub fn parse_date_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y%m%dT%H%M%S",
        "%B %d, %Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            let midnight = parsed.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&midnight));
        }
    }

    debug!(target: TARGET_WEB_REQUEST, "Unrecognized date format: {}", raw);
    None
}

/// True when the publication date falls inside the lookback window
/// relative to `now`.
pub fn within_lookback(published_at: &DateTime<Utc>, now: DateTime<Utc>) -> bool {
    *published_at >= now - ChronoDuration::days(LOOKBACK_DAYS)
}

/// Non-English articles are dropped at ingest; detection failure counts
/// as non-English.
pub fn is_english(title: &str) -> bool {
    whatlang::detect(title)
        .map(|info| info.lang() == whatlang::Lang::Eng)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_source_formats() {
        assert!(parse_date_lenient("2026-07-14T09:30:00Z").is_some());
        assert!(parse_date_lenient("Tue, 14 Jul 2026 09:30:00 +0000").is_some());
        assert!(parse_date_lenient("2026-07-14 09:30:00").is_some());
        assert!(parse_date_lenient("20260714T093000").is_some());
        assert!(parse_date_lenient("July 14, 2026").is_some());
        assert!(parse_date_lenient("Jul 14, 2026").is_some());
        assert!(parse_date_lenient("07/14/2026").is_some());
    }

    #[test]
    fn unparsable_dates_are_none() {
        assert!(parse_date_lenient("No date").is_none());
        assert!(parse_date_lenient("").is_none());
        assert!(parse_date_lenient("Invalid date format").is_none());
    }

    #[test]
    fn lookback_window_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 12, 0, 0).unwrap();
        let fresh = now - ChronoDuration::days(29);
        let stale = now - ChronoDuration::days(31);
        assert!(within_lookback(&fresh, now));
        assert!(!within_lookback(&stale, now));
    }

    #[test]
    fn english_filter() {
        assert!(is_english(
            "Acme Corporation beats quarterly earnings expectations and raises guidance"
        ));
        assert!(!is_english(
            "Acme ylitti analyytikoiden odotukset ja nostaa koko vuoden ohjeistustaan selvästi"
        ));
    }
}
