use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::feed::parser::{self, Channel, ParseError};

/// Whole-fetch deadline (request plus body read) unless overridden.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!("trawl/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching and decoding one feed.
///
/// There is no retry here: a failed fetch surfaces immediately and the
/// scheduler decides when the feed gets another attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured deadline
    #[error("Request timed out")]
    Timeout,
    /// Response body was not an RSS document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// HTTP fetcher for feed documents.
///
/// Holds the reqwest client and the per-fetch deadline; the deadline is
/// injectable so tests don't wait 30 seconds for a stalled mock.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    deadline: Duration,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_deadline(DEFAULT_DEADLINE)
    }

    pub fn with_deadline(deadline: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, deadline })
    }

    /// Fetches a feed URL and decodes the body as an RSS channel.
    ///
    /// The deadline covers the request and the body read; decoding is
    /// CPU-bound on an already size-capped buffer and runs outside it.
    pub async fn fetch(&self, url: &str) -> Result<Channel, FetchError> {
        let bytes = tokio::time::timeout(self.deadline, self.read_body(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let body = String::from_utf8_lossy(&bytes);
        Ok(parser::parse_channel(&body)?)
    }

    async fn read_body(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_BODY_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust Content-Length when the server sends one
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A feed for tests</description>
    <item>
        <title>Hello</title>
        <link>https://example.com/p1</link>
        <description>First post</description>
        <pubDate>Mon, 02 Jan 2006 15:04:05 MST</pubDate>
    </item>
</channel></rss>"#;

    fn fast_fetcher() -> Fetcher {
        Fetcher::with_deadline(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let channel = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(channel.title, "Test Feed");
        assert_eq!(channel.items.len(), 1);
        assert_eq!(channel.items[0].title, "Hello");
        assert_eq!(channel.items[0].link, "https://example.com/p1");
        assert_eq!(channel.items[0].pub_date, "Mon, 02 Jan 2006 15:04:05 MST");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_server_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1) // one attempt, no retry loop
            .mount(&mock_server)
            .await;

        let err = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::HttpStatus(503) => {}
            e => panic!("Expected HttpStatus(503), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let err = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::Parse(_) => {}
            e => panic!("Expected Parse error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_empty_channel_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        let channel = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert!(channel.items.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_BODY_SIZE + 1)))
            .mount(&mock_server)
            .await;

        let err = fast_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::ResponseTooLarge => {}
            e => panic!("Expected ResponseTooLarge, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::with_deadline(Duration::from_millis(50)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            FetchError::Timeout => {}
            e => panic!("Expected Timeout, got {:?}", e),
        }
    }
}
