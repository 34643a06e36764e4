use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, warn};

use crate::error::{FetchError, ScrapeError};

/// Support address the site embeds in its robot-check page.
pub const CHALLENGE_MARKER: &str = "api-services-support@amazon.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The single session used for every page request of a run.
#[async_trait]
pub trait PageFetcher: Send {
    /// Final page content for `url`.
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError>;

    /// Release the session. Called once at the end of the run.
    async fn close(&mut self) {}
}

/// Outcome of a fetch once the content has been checked for a robot wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Page(String),
    Challenge,
}

impl Fetched {
    pub fn classify(content: String) -> Self {
        if content.contains(CHALLENGE_MARKER) {
            Fetched::Challenge
        } else {
            Fetched::Page(content)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt + 1`: `base_backoff * 2^attempt`, saturating.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Fetch `url`, retrying transient transport failures, then check the
/// content for an anti-automation wall. A wall is returned, never retried.
pub async fn fetch_checked(
    fetcher: &mut dyn PageFetcher,
    url: &str,
    retry: &RetryPolicy,
) -> Result<Fetched, ScrapeError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url).await {
            Ok(content) => {
                debug!("Fetched {} ({} bytes)", url, content.len());
                return Ok(Fetched::classify(content));
            }
            Err(e) if attempt < retry.max_retries && is_transient(&e) => {
                let backoff = retry.backoff(attempt);
                attempt += 1;
                warn!(
                    "Fetch failed for {} (attempt {}/{}): {}, backing off {:.1}s",
                    url,
                    attempt,
                    retry.max_retries,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
            Err(source) => {
                return Err(ScrapeError::Fetch {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }
}

fn is_transient(e: &FetchError) -> bool {
    match e {
        FetchError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        FetchError::Render(_) => true,
    }
}

/// Plain HTTP session. Does not execute page scripts.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // Robot walls are often served with an error status; let the caller see them.
        if !status.is_success() && !body.contains(CHALLENGE_MARKER) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(body)
    }
}

/// Rendered-page session through the spider.cloud service.
pub struct SpiderFetcher {
    spider: Spider,
}

impl SpiderFetcher {
    pub fn new(api_key: String) -> Result<Self, FetchError> {
        let spider = Spider::new(Some(api_key))
            .map_err(|e| FetchError::Render(format!("Failed to create Spider client: {}", e)))?;
        Ok(Self { spider })
    }
}

#[async_trait]
impl PageFetcher for SpiderFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| FetchError::Render(format!("Spider scrape failed: {}", e)))?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        let first = parsed.as_array().and_then(|arr| arr.first());

        let content = first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| FetchError::Render("No content in spider response".into()))?;

        let status = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_u64());
        if let Some(status) = status {
            if !(200..300).contains(&status) && !content.contains(CHALLENGE_MARKER) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status as u16,
                });
            }
        }
        Ok(content)
    }
}
