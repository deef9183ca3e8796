//! HTTP fetch capabilities for listing and speech pages
//!
//! Listing pages and speech pages are both plain GETs. Transient failures (timeouts,
//! refused connections, 429/500/502/503/504) are retried with exponential backoff and
//! jitter; anything else fails the item immediately.

use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Response};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::crawler::error::FetchError;
use crate::error::Result;

/// A fetched listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute URL the page was fetched from, used to resolve relative links
    pub url: String,

    /// Page markup
    pub html: String,
}

/// Capability to fetch a year's listing page
#[allow(async_fn_in_trait)]
pub trait ListingSource {
    async fn fetch_listing(&self, url: &str) -> std::result::Result<ListingPage, FetchError>;
}

/// Capability to fetch the raw markup of a speech page
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    async fn fetch_document(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// reqwest-backed fetcher implementing both capabilities
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Retries allowed after the first attempt
    max_retries: u32,

    /// Base delay of the exponential backoff
    backoff_factor: Duration,

    /// Cap on a single backoff sleep
    max_backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_factor: Duration::from_millis(config.backoff_factor_ms),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        })
    }

    /// GET a page body, retrying transient failures
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let (failure, retry_after) = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .map_err(|e| FetchError::from_reqwest(url, e));
                }
                Ok(response) => {
                    let retry_after = retry_after(&response);
                    let failure = FetchError::Status {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    };
                    (failure, retry_after)
                }
                Err(e) => (FetchError::from_reqwest(url, e), None),
            };

            if !failure.is_transient() {
                return Err(failure);
            }
            if attempts > self.max_retries {
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                    last: failure.to_string(),
                });
            }

            let delay = self.backoff(attempts, retry_after);
            warn!(
                "{} (attempt {}/{}), retrying in {:?}",
                failure,
                attempts,
                self.max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Delay before the next attempt: `factor * 2^(attempt-1)` or the server's
    /// Retry-After if longer, with ±20% jitter, capped
    fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exp_factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let mut delay = self.backoff_factor.saturating_mul(exp_factor);
        if let Some(retry_after) = retry_after {
            delay = delay.max(retry_after);
        }
        if delay >= self.max_backoff {
            return self.max_backoff;
        }

        if !delay.is_zero() {
            let jitter_factor = rand::thread_rng().gen_range(0.8..1.2);
            delay = Duration::try_from_secs_f64(delay.as_secs_f64() * jitter_factor)
                .unwrap_or(self.max_backoff);
        }

        delay.min(self.max_backoff)
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl ListingSource for HttpFetcher {
    async fn fetch_listing(&self, url: &str) -> std::result::Result<ListingPage, FetchError> {
        let html = self.get(url).await?;
        debug!("Fetched listing {} ({} bytes)", url, html.len());
        Ok(ListingPage {
            url: url.to_string(),
            html,
        })
    }
}

impl DocumentSource for HttpFetcher {
    async fn fetch_document(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher(max_retries: u32) -> HttpFetcher {
        let config = HttpConfig {
            max_retries,
            backoff_factor_ms: 0,
            timeout_secs: 5,
            ..HttpConfig::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/newsevents/speech/powell20230315a.htm")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><p>Hello</p></body></html>")
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/newsevents/speech/powell20230315a.htm", server.url());
        let body = fetcher(3).fetch_document(&url).await.unwrap();
        assert!(body.contains("<p>Hello</p>"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_permanent_status_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.htm")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/missing.htm", server.url());
        let result = fetcher(3).fetch_document(&url).await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_status_retries_are_capped() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/busy.htm")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let url = format!("{}/busy.htm", server.url());
        let result = fetcher(2).fetch_document(&url).await;
        match result {
            Err(FetchError::RetriesExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("503"));
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_listing_keeps_page_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/newsevents/speech/2023-speeches.htm")
            .with_status(200)
            .with_body("<a href='/newsevents/speech/x20230101a.htm'>x</a>")
            .create_async()
            .await;

        let url = format!("{}/newsevents/speech/2023-speeches.htm", server.url());
        let page = fetcher(0).fetch_listing(&url).await.unwrap();
        assert_eq!(page.url, url);
        assert!(page.html.contains("x20230101a.htm"));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let fetcher = HttpFetcher {
            client: ReqwestClient::new(),
            max_retries: 5,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(3),
        };

        let first = fetcher.backoff(1, None);
        assert!(first >= Duration::from_millis(400) && first <= Duration::from_millis(600));

        let third = fetcher.backoff(3, None);
        assert!(third >= Duration::from_millis(1600) && third <= Duration::from_millis(2400));

        assert_eq!(fetcher.backoff(10, None), Duration::from_secs(3));
        assert_eq!(
            fetcher.backoff(1, Some(Duration::from_secs(30))),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_huge_retry_after_is_capped() {
        let fetcher = HttpFetcher {
            client: ReqwestClient::new(),
            max_retries: 5,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        };

        for _ in 0..20 {
            assert_eq!(
                fetcher.backoff(1, Some(Duration::from_secs(u64::MAX))),
                Duration::from_secs(60)
            );
        }
        assert_eq!(fetcher.backoff(u32::MAX, None), Duration::from_secs(60));

        let uncapped = HttpFetcher {
            max_backoff: Duration::MAX,
            ..fetcher
        };
        let delay = uncapped.backoff(1, Some(Duration::from_secs(u64::MAX / 2)));
        assert!(delay >= Duration::from_secs(u64::MAX / 4));
    }
}
