use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::{parse_date_lenient, within_lookback, FetchContext, MAX_ARTICLES_PER_SOURCE};
use crate::types::Article;
use crate::TARGET_WEB_REQUEST;

/// Listing-page selectors change with site redesigns, so each element is
/// hunted through a cascade.
const NEWS_SECTION_SELECTORS: &[&str] = &[
    "div.fade-bottom",
    "div.news-feed",
    "div.news-articles",
    "section.company-news",
];
const ARTICLE_SELECTORS: &[&str] = &[
    "div.mt-1.bg-white.light-shadow.d-flex",
    "div.news-item",
    "article",
    "div.article-item",
];
const TITLE_SELECTORS: &[&str] = &["a.d-block.mb-1", "a.headline", "h3 a", "h4 a", "a.title"];
const META_SELECTORS: &[&str] = &["div.byline.mb-1", "div.meta", "div.date", "span.date"];

struct Stub {
    title: String,
    url: String,
    source: String,
    date_raw: String,
}

/// US fetcher: scrapes the MarketBeat company page, trying NASDAQ then
/// NYSE. Stops at the first exchange page that yields articles.
pub async fn fetch_us_news(ctx: &mut FetchContext, symbol: &str) -> Vec<Article> {
    let now = Utc::now();
    let mut articles: Vec<Article> = Vec::new();

    for exchange in ["NASDAQ", "NYSE"] {
        let url = format!("https://www.marketbeat.com/stocks/{exchange}/{symbol}/");
        let base = match Url::parse(&url) {
            Ok(base) => base,
            Err(_) => continue,
        };
        info!(target: TARGET_WEB_REQUEST, "Trying to fetch news from {}", url);

        let body = match ctx.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Failed to read {}: {}", url, err);
                    continue;
                }
            },
            Ok(response) => {
                warn!(target: TARGET_WEB_REQUEST, "Status {} from {}", response.status(), url);
                continue;
            }
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Error fetching news for {} on {}: {}", symbol, exchange, err);
                continue;
            }
        };

        let stubs = scrape_listing(&body, &base);
        if stubs.is_empty() {
            warn!(target: TARGET_WEB_REQUEST, "No articles found for {} on {}", symbol, exchange);
            continue;
        }

        for stub in stubs {
            if articles.len() >= MAX_ARTICLES_PER_SOURCE {
                break;
            }

            let published_at = match parse_listing_date(&stub.date_raw, now) {
                Some(date) => date,
                None => {
                    warn!(target: TARGET_WEB_REQUEST, "Error parsing date '{}' for symbol {}", stub.date_raw, symbol);
                    continue;
                }
            };
            if !within_lookback(&published_at, now) {
                continue;
            }

            ctx.limiter.acquire().await;
            let full_text = ctx.extractor.extract(&stub.url).await;

            let article = Article {
                title: stub.title,
                url: stub.url,
                published_at: Some(published_at),
                source: stub.source,
                full_text,
            };
            if !article.has_full_text() && articles.iter().any(Article::has_full_text) {
                debug!(target: TARGET_WEB_REQUEST, "Skipping textless article {}", article.url);
                continue;
            }
            articles.push(article);
        }

        if !articles.is_empty() {
            break;
        }
    }

    articles
}

/// Pulls article stubs out of a company listing page using the selector
/// cascades. Relative hrefs resolve against the listing page URL.
fn scrape_listing(body: &str, base: &Url) -> Vec<Stub> {
    let doc = Html::parse_document(body);

    let section = NEWS_SECTION_SELECTORS.iter().find_map(|selector| {
        let sel = Selector::parse(selector).ok()?;
        doc.select(&sel).next()
    });
    let section = match section {
        Some(section) => section,
        None => return Vec::new(),
    };

    let rows = ARTICLE_SELECTORS.iter().find_map(|selector| {
        let sel = Selector::parse(selector).ok()?;
        let rows: Vec<_> = section.select(&sel).collect();
        (!rows.is_empty()).then_some(rows)
    });
    let rows = match rows {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    let mut stubs = Vec::new();
    for row in rows {
        let title_el = TITLE_SELECTORS.iter().find_map(|selector| {
            let sel = Selector::parse(selector).ok()?;
            row.select(&sel).next()
        });
        let title_el = match title_el {
            Some(el) => el,
            None => continue,
        };
        let title = title_el.text().collect::<String>().trim().to_string();
        let url = match title_el
            .value()
            .attr("href")
            .and_then(|href| base.join(href).ok())
        {
            Some(resolved) => resolved.to_string(),
            None => continue,
        };

        // The byline packs "date | source" into one element.
        let mut source = "MarketBeat".to_string();
        let mut date_raw = String::new();
        let meta = META_SELECTORS.iter().find_map(|selector| {
            let sel = Selector::parse(selector).ok()?;
            row.select(&sel).next()
        });
        if let Some(meta) = meta {
            let text = meta.text().collect::<String>().trim().to_string();
            match text.split_once('|') {
                Some((date_part, source_part)) => {
                    date_raw = date_part.trim().to_string();
                    source = source_part.trim().to_string();
                }
                None => date_raw = text,
            }
        }

        stubs.push(Stub {
            title,
            url,
            source,
            date_raw,
        });
    }
    stubs
}

/// Listing dates come either dated ("July 14, 2026") or same-year
/// relative ("July 14 at 9:30 AM"), which needs the current year glued
/// on before parsing.
fn parse_listing_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.contains(" at ") {
        let with_year = format!("{raw} {}", now.year());
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&with_year, "%B %d at %I:%M %p %Y") {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    parse_date_lenient(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scrapes_rows_from_listing_markup() {
        let body = r#"<html><body><div class="fade-bottom">
            <div class="news-item">
              <a class="headline" href="/originals/acme-earnings">Acme beats estimates</a>
              <div class="byline mb-1">July 14, 2026 | Acme Wire</div>
            </div>
            <div class="news-item">
              <a class="headline" href="https://example.com/acme">Acme launches product</a>
              <div class="byline mb-1">July 10, 2026 | Example News</div>
            </div>
        </div></body></html>"#;
        let base = Url::parse("https://www.marketbeat.com/stocks/NASDAQ/ACME/").unwrap();
        let stubs = scrape_listing(body, &base);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title, "Acme beats estimates");
        assert_eq!(stubs[0].url, "https://www.marketbeat.com/originals/acme-earnings");
        assert_eq!(stubs[0].source, "Acme Wire");
        assert_eq!(stubs[0].date_raw, "July 14, 2026");
    }

    #[test]
    fn missing_section_yields_nothing() {
        let base = Url::parse("https://www.marketbeat.com/stocks/NASDAQ/ACME/").unwrap();
        assert!(scrape_listing("<html><body><p>maintenance</p></body></html>", &base).is_empty());
    }

    #[test]
    fn same_year_listing_date_gets_current_year() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 12, 0, 0).unwrap();
        let parsed = parse_listing_date("July 14 at 9:30 AM", now).unwrap();
        assert_eq!(parsed.year(), 2026);
        assert_eq!(parsed.month(), 7);
        assert_eq!(parsed.day(), 14);
    }
}
