//! Form POST with bounded transport retry

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::error::{Error, Result};
use crate::form::Form;
use crate::retry::{RetryPolicy, is_retryable};

/// Gateway base URL. All endpoints are paths below it.
pub const DEFAULT_BASE_URL: &str = "https://cloud-gateway.midu.com";

/// Whole-request timeout for a single attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// TCP/TLS connect timeout for a single attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport to the gateway.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its pool.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Transport {
    /// Build a transport with the fixed per-attempt timeouts.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing client. Timeouts are whatever that client was built with.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `form` to `base_url + path` and parse the JSON body.
    ///
    /// Connection failures, timeouts and non-200 statuses are retried per the
    /// retry policy. Once attempts are exhausted the last failure is returned.
    /// Any other request error fails immediately.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn post_form(&self, path: &str, form: &Form, headers: &HeaderMap) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let sent = self
                .client
                .post(&url)
                .headers(headers.clone())
                .form(form.fields())
                .send()
                .await;

            let failure = match sent {
                Ok(response) if response.status() == StatusCode::OK => {
                    let body = response.text().await.map_err(Error::Request)?;
                    debug!(attempt, bytes = body.len(), "gateway responded");
                    return serde_json::from_str(&body).map_err(Error::Decode);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    Error::Status {
                        status,
                        attempts: attempt,
                        body,
                    }
                }
                Err(e) if is_retryable(&e) => Error::Connect {
                    attempts: attempt,
                    source: e,
                },
                Err(e) => {
                    error!(error = %e, "gateway request failed");
                    return Err(Error::Request(e));
                }
            };

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %failure, "gateway request failed after all retries");
                return Err(failure);
            }

            let delay = self.retry.delay_after(attempt);
            warn!(
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %failure,
                "gateway request failed, retrying"
            );
            metrics::counter!("jdt_transport_retries_total").increment(1);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
