use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::retry::RetryConfig;
use crate::errors::{AppError, AppResult};

/// Configuration for the retrying HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            retry_config: RetryConfig::default(),
            user_agent: Some(concat!("xiaomi-push/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// A completed HTTP exchange, whatever its status
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
    /// Wall time of the attempt that produced this response
    pub elapsed: Duration,
}

impl GatewayResponse {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// HTTP client that retries network-layer failures only.
///
/// Any response that carries a status line counts as delivered to the
/// gateway and is returned as-is, including 4xx and 5xx.
#[derive(Clone)]
pub struct RetryingHttpClient {
    client: Client,
    config: HttpClientConfig,
    retries: Arc<AtomicU64>,
}

impl RetryingHttpClient {
    pub fn new(config: HttpClientConfig) -> AppResult<Self> {
        let mut client_builder = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);

        if let Some(user_agent) = &config.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }

        let client = client_builder.build().map_err(|e| AppError::Internal {
            message: "Failed to create HTTP client".to_string(),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            config,
            retries: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of retry attempts made since construction
    pub fn retry_count(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// POST an urlencoded form
    pub async fn post_form<F>(&self, url: &str, headers: &HeaderMap, form: &F) -> AppResult<GatewayResponse>
    where
        F: Serialize + ?Sized,
    {
        self.execute_with_retry("POST", url, || {
            self.client.post(url).headers(headers.clone()).form(form)
        })
        .await
    }

    /// GET with query parameters
    pub async fn get_query<Q>(&self, url: &str, headers: &HeaderMap, query: &Q) -> AppResult<GatewayResponse>
    where
        Q: Serialize + ?Sized,
    {
        self.execute_with_retry("GET", url, || {
            self.client.get(url).headers(headers.clone()).query(query)
        })
        .await
    }

    async fn execute_with_retry<B>(&self, method: &str, url: &str, build: B) -> AppResult<GatewayResponse>
    where
        B: Fn() -> RequestBuilder,
    {
        let retry = &self.config.retry_config;
        let mut attempt = 0;

        loop {
            match self.execute_once(method, url, build()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retry.should_retry(attempt) => {
                    warn!(
                        "{} {} failed (attempt {}/{}), retrying in {}ms: {}",
                        method,
                        url,
                        attempt + 1,
                        retry.max_attempts,
                        retry.delay_ms,
                        e
                    );
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    sleep(retry.delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_once(&self, method: &str, url: &str, request: RequestBuilder) -> AppResult<GatewayResponse> {
        let start = Instant::now();
        let timeout_ms = self.config.timeout_ms;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_transport(e, method, url, timeout_ms))?;
        let status = response.status().as_u16();
        // A body cut off mid-stream is still a network failure.
        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_transport(e, method, url, timeout_ms))?;
        let elapsed = start.elapsed();

        debug!("{} {} -> {} in {:?}", method, url, status, elapsed);
        Ok(GatewayResponse { status, body, elapsed })
    }
}
