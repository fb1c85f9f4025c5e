use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::collections::{CollectionApi, CollectionKind};
use super::common::{ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;
use super::stats::{RequestStats, StatsRecorder};
use super::provision::ProvisionRequestsApi;

/// Credentials sent with every API request
#[derive(Clone, Debug)]
pub enum Auth {
    Basic { username: String, password: String },
    Token(String),
}

/// Appliance REST API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth: Auth,
    retry_config: RetryConfig,
    stats: StatsRecorder,
}

/// Retry policy for idempotent reads. Actions are sent exactly once.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 200,
            max_backoff_ms: 5000,
            timeout_seconds: 60,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (1-based), doubling up to `max_backoff_ms`
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, auth: Auth, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, auth, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        auth: Auth,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{endpoint}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{endpoint}: unsupported scheme `{}`",
                parsed.scheme()
            )));
        }

        // appliances usually run with self-signed certificates
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                auth,
                retry_config,
                stats: StatsRecorder::default(),
            }),
        })
    }

    /// Resolves an API path (`/api/vms`) or an absolute href returned by the server.
    pub fn url_for(&self, path_or_href: &str) -> String {
        if path_or_href.starts_with("http://") || path_or_href.starts_with("https://") {
            path_or_href.to_string()
        } else {
            format!("{}{}", self.inner.base_url, path_or_href)
        }
    }

    /// Access a top-level collection
    pub fn collection(&self, kind: CollectionKind) -> CollectionApi<'_> {
        CollectionApi::new(self, kind)
    }

    /// Provision request operations
    pub fn provision_requests(&self) -> ProvisionRequestsApi<'_> {
        ProvisionRequestsApi::new(self)
    }

    /// Request counters since the client was created
    pub async fn get_request_stats(&self) -> RequestStats {
        self.inner.stats.snapshot().await
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url_for(path);
        let url = url.as_str();
        self.execute(
            || async move {
                tracing::debug!("GET request to: {}", url);
                self.authorize(self.inner.http_client.get(url)).send().await
            },
            path,
            self.inner.retry_config.max_retries,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request, sent once
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url_for(path);
        let url = url.as_str();
        self.execute(
            || async move {
                tracing::debug!("POST request to: {}", url);
                self.authorize(self.inner.http_client.post(url))
                    .json(body)
                    .send()
                    .await
            },
            path,
            0,
        )
        .await
    }

    /// Execute a DELETE request, sent once
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url_for(path);
        let url = url.as_str();
        self.execute(
            || async move {
                tracing::debug!("DELETE request to: {}", url);
                self.authorize(self.inner.http_client.delete(url))
                    .send()
                    .await
            },
            path,
            0,
        )
        .await
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.auth {
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Token(token) => builder.header("X-Auth-Token", token),
        }
    }

    /// Execute request, retrying transient failures up to `max_retries` times
    async fn execute<F, Fut, T>(
        &self,
        request_fn: F,
        path: &str,
        max_retries: u32,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff_ms(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner.stats.retry().await;
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            let last_attempt = attempt == max_retries;

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.stats.request(true).await;
                        return self.parse_success_response(response).await;
                    }

                    self.inner.stats.request(false).await;

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    let transient = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();
                    if !transient || last_attempt {
                        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                            return Err(ApiError::RateLimited);
                        }
                        return self.handle_error_response(response).await;
                    }
                    last_error = Some(ApiError::ServiceUnavailable);
                }
                Err(e) => {
                    self.inner.stats.request(false).await;

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if (e.is_connect() || e.is_request()) && !last_attempt {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; an empty body (204) decodes as JSON `null`
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .map(|err_resp| Box::new(err_resp.error));

        let message = details
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or(text);

        Err(ApiError::ApiError {
            status,
            message,
            details,
        })
    }
}
