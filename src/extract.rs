use reqwest::StatusCode;
use scraper::{Html, Selector};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

use crate::{FULL_TEXT_NOT_FOUND, TARGET_WEB_REQUEST};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Minimum plausible article length; anything shorter is boilerplate.
const MIN_ARTICLE_CHARS: usize = 100;
/// Raw page text has to clear a higher bar to count as content.
const MIN_RAW_TEXT_CHARS: usize = 200;
/// Paragraphs below this length are navigation and cookie banners.
const MIN_PARAGRAPH_CHARS: usize = 50;

/// Known publishers and the container their article bodies live in.
/// Matched against the post-redirect host, in order; adding a publisher
/// means adding an entry here.
struct PublisherSelector {
    host: &'static str,
    container: &'static str,
}

impl PublisherSelector {
    fn matches(&self, host: &str) -> bool {
        host == self.host || host.ends_with(&format!(".{}", self.host))
    }
}

const PUBLISHERS: &[PublisherSelector] = &[
    PublisherSelector {
        host: "finance.yahoo.com",
        container: "div.caas-body",
    },
    PublisherSelector {
        host: "globenewswire.com",
        container: "div.main-body-container.article-body",
    },
    PublisherSelector {
        host: "marketbeat.com",
        container: "div.article-body",
    },
];

/// Common article-body containers, tried in order when no publisher rule
/// matches.
const GENERIC_SELECTORS: &[&str] = &[
    "article",
    ".article-body",
    ".article-content",
    ".story-body",
    ".story-content",
    ".post-content",
    ".entry-content",
    "main",
    ".caas-body",
    "#article-body",
    ".article__body",
    ".article-text",
    ".article__content",
    ".content-article",
    ".article",
];

/// Best-effort plain-text extraction from an article URL. Never fails
/// outward; every error path collapses to the `FULL_TEXT_NOT_FOUND`
/// sentinel.
#[derive(Clone, Debug)]
pub struct Extractor {
    client: reqwest::Client,
    max_retries: usize,
    initial_backoff: Duration,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// Shrinks the retry policy, for tests that must not sleep.
    pub fn with_retry(mut self, max_retries: usize, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    /// Fetches the URL and extracts article text. Connection errors, 429
    /// and 5xx responses are retried with doubling backoff; a 404 or any
    /// other 4xx is terminal.
    pub async fn extract(&self, article_url: &str) -> String {
        let mut backoff = self.initial_backoff;

        for attempt in 0..self.max_retries {
            match self.client.get(article_url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        error!(target: TARGET_WEB_REQUEST, "Article not found (404): {}", article_url);
                        return FULL_TEXT_NOT_FOUND.to_string();
                    }
                    if status.is_success() {
                        let host = response.url().host_str().map(str::to_string);
                        match response.text().await {
                            Ok(body) => {
                                if let Some(text) = extract_from_html(&body, host.as_deref()) {
                                    debug!(target: TARGET_WEB_REQUEST, "Extracted {} chars from {}", text.len(), article_url);
                                    return text;
                                }
                                warn!(target: TARGET_WEB_REQUEST, "No meaningful text found at {}", article_url);
                                return FULL_TEXT_NOT_FOUND.to_string();
                            }
                            Err(err) => {
                                warn!(target: TARGET_WEB_REQUEST, "Failed to read body from {}: {}", article_url, err);
                            }
                        }
                    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!(target: TARGET_WEB_REQUEST, "Status {} from {}, retrying", status, article_url);
                    } else {
                        error!(target: TARGET_WEB_REQUEST, "Failed to retrieve article. Status code: {} ({})", status, article_url);
                        return FULL_TEXT_NOT_FOUND.to_string();
                    }
                }
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Error fetching article at {}: {}", article_url, err);
                }
            }

            if attempt < self.max_retries - 1 {
                debug!(target: TARGET_WEB_REQUEST, "Backing off {:?} before retry", backoff);
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        error!(target: TARGET_WEB_REQUEST, "Could not extract article text from {}", article_url);
        FULL_TEXT_NOT_FOUND.to_string()
    }
}

/// Runs the extraction cascade over an already-fetched document:
/// publisher rule, generic containers, all plausible paragraphs, then raw
/// page text.
pub fn extract_from_html(body: &str, host: Option<&str>) -> Option<String> {
    let doc = Html::parse_document(body);

    if let Some(host) = host {
        for publisher in PUBLISHERS {
            if publisher.matches(host) {
                if let Some(text) = container_text(&doc, publisher.container, MIN_ARTICLE_CHARS) {
                    return Some(text);
                }
            }
        }
    }

    for selector in GENERIC_SELECTORS {
        if let Some(text) = container_text(&doc, selector, MIN_ARTICLE_CHARS) {
            return Some(text);
        }
    }

    if let Some(text) = all_paragraphs(&doc) {
        return Some(text);
    }

    let raw = collapse_whitespace(&doc.root_element().text().collect::<Vec<_>>().join(" "));
    if raw.len() > MIN_RAW_TEXT_CHARS {
        return Some(raw);
    }

    None
}

/// Joins the paragraphs inside the first container the selector matches,
/// falling back to the container's own text when it holds no `<p>` tags.
fn container_text(doc: &Html, selector: &str, min_chars: usize) -> Option<String> {
    let container_sel = Selector::parse(selector).ok()?;
    let paragraph_sel = Selector::parse("p").ok()?;
    let container = doc.select(&container_sel).next()?;

    let paragraphs: Vec<String> = container
        .select(&paragraph_sel)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    let text = if paragraphs.is_empty() {
        collapse_whitespace(&container.text().collect::<Vec<_>>().join(" "))
    } else {
        paragraphs.join("\n")
    };

    (text.len() > min_chars).then_some(text)
}

fn all_paragraphs(doc: &Html) -> Option<String> {
    let paragraph_sel = Selector::parse("p").ok()?;
    let paragraphs: Vec<String> = doc
        .select(&paragraph_sel)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| text.len() > MIN_PARAGRAPH_CHARS)
        .collect();
    if paragraphs.is_empty() {
        return None;
    }
    let text = paragraphs.join("\n");
    (text.len() > MIN_ARTICLE_CHARS).then_some(text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
