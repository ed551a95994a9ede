//! HTTP fetching shared by the scraping engines.

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::errors::{AdapterError, ConfigurationError};
use crate::search::FetchConfig;

const ENGINE: &str = "http";

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl FetchResult {
    /// Creates a successful result, mainly for tests.
    #[must_use]
    pub fn ok(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            text: text.into(),
            final_url: url.into(),
            duration_ms: 0.0,
        }
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Protocol for HTTP fetching.
///
/// Errors are attributed to the `http` engine; adapters re-attribute them
/// with [`AdapterError::for_engine`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches a URL with GET.
    async fn get(&self, url: &str) -> Result<FetchResult, AdapterError>;
}

/// [`HttpFetcher`] backed by reqwest, with proxy support and retries.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ReqwestFetcher {
    /// Builds the client from the fetch configuration.
    pub fn new(config: FetchConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ConfigurationError::invalid_proxy(proxy, e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigurationError::invalid_value("fetch", e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchResult, AdapterError> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let can_retry = attempt < retry.max_retries;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if can_retry && retry.should_retry_status(status) {
                        let delay = retry.delay_for_attempt(attempt);
                        debug!(url, status, attempt, delay_ms = delay.as_millis(), "retrying request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if status == 429 {
                        return Err(AdapterError::rate_limited(ENGINE, format!("HTTP 429 from {url}")));
                    }
                    if !response.status().is_success() {
                        return Err(AdapterError::unavailable(ENGINE, format!("HTTP {status} from {url}")));
                    }

                    let final_url = response.url().to_string();
                    let text = response
                        .text()
                        .await
                        .map_err(|e| AdapterError::parse_failure(ENGINE, e.to_string()))?;

                    return Ok(FetchResult {
                        status_code: status,
                        text,
                        final_url,
                        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                    });
                }
                Err(e) if can_retry && (e.is_timeout() || e.is_connect()) => {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(url, error = %e, attempt, "retrying request after transport error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_timeout() => {
                    return Err(AdapterError::timeout(ENGINE, e.to_string()));
                }
                Err(e) => {
                    return Err(AdapterError::unavailable(ENGINE, e.to_string()));
                }
            }
        }
    }
}
