use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("server responded with HTTP {0}")]
    HttpStatus(u16),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    #[error("no such resource: {0}")]
    NotFound(Url),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::HttpStatus(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *code >= 500
            }
            FetchError::Network(_) => true,
            _ => false,
        }
    }
}

/// Text-over-HTTP capability used by the pipeline. Implementations must be
/// safe to share between worker tasks.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

fn check_scheme(url: &Url) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

/// reqwest-backed fetcher with a per-request timeout and bounded retries.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str, retry_attempts: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client, retry_attempts: retry_attempts.max(1) })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        check_scheme(url)?;
        fetch_with_retries(self.retry_attempts, move || self.fetch_once(url)).await
    }
}

/// Run `attempt` up to `attempts` times, backing off linearly between
/// transient failures.
pub async fn fetch_with_retries<F, Fut>(attempts: usize, mut attempt: F) -> Result<String, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Ok(body) => return Ok(body),
            Err(e) if tries < attempts && e.is_transient() => {
                log::debug!("attempt {tries}/{attempts} failed: {e}; retrying");
                tokio::time::sleep(Duration::from_millis(200 * tries as u64)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// In-memory fetcher – useful for testing and offline replays.
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, Result<String, u16>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(normalize_key(url), Ok(body.into()));
        self
    }

    /// Answer `url` with a non-2xx status.
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(normalize_key(url), Err(status));
        self
    }
}

fn normalize_key(url: &str) -> String {
    Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        check_scheme(url)?;
        match self.pages.get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::HttpStatus(*status)),
            None => Err(FetchError::NotFound(url.clone())),
        }
    }
}
