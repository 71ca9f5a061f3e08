use httpmock::{Method::GET, MockServer};
use tokio::time::Duration;

use whymoves::extract::Extractor;
use whymoves::FULL_TEXT_NOT_FOUND;

fn fast_extractor() -> Extractor {
    Extractor::new().with_retry(3, Duration::from_millis(5))
}

fn article_page() -> String {
    let paragraph = "Shares of Acme climbed sharply after the company reported quarterly \
        revenue well ahead of consensus and raised its full-year guidance.";
    format!("<html><body><article><p>{paragraph}</p><p>{paragraph}</p></article></body></html>")
}

#[tokio::test]
async fn extracts_article_body_on_success() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/news/acme");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_page());
    });

    let text = fast_extractor().extract(&server.url("/news/acme")).await;

    mock.assert();
    assert!(text.starts_with("Shares of Acme climbed"));
}

#[tokio::test]
async fn not_found_is_terminal_without_retry() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404);
    });

    let text = fast_extractor().extract(&server.url("/gone")).await;

    assert_eq!(text, FULL_TEXT_NOT_FOUND);
    mock.assert_hits(1);
}

#[tokio::test]
async fn other_client_errors_are_terminal_without_retry() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/forbidden");
        then.status(403);
    });

    let text = fast_extractor().extract(&server.url("/forbidden")).await;

    assert_eq!(text, FULL_TEXT_NOT_FOUND);
    mock.assert_hits(1);
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/flaky");
        then.status(500);
    });

    let text = fast_extractor().extract(&server.url("/flaky")).await;

    assert_eq!(text, FULL_TEXT_NOT_FOUND);
    mock.assert_hits(3);
}

#[tokio::test]
async fn rate_limiting_is_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/limited");
        then.status(429);
    });

    let text = fast_extractor().extract(&server.url("/limited")).await;

    assert_eq!(text, FULL_TEXT_NOT_FOUND);
    mock.assert_hits(3);
}

#[tokio::test]
async fn implausibly_short_pages_yield_the_sentinel() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/thin");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html><body><p>ok</p></body></html>");
    });

    let text = fast_extractor().extract(&server.url("/thin")).await;

    assert_eq!(text, FULL_TEXT_NOT_FOUND);
}
