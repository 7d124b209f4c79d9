use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::core::{
    ErrorResponse, ModelInfo, PredictRequest, PredictResponse, PredictorError, PredictorResult,
    StatusResponse,
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on any single backoff pause.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry Configuration for API Calls
#[derive(Debug, Clone)]
pub struct RetryConfiguration {
    pub max_retries: u8,
    pub base_delay: Duration,
    pub backoff_strategy: BackoffStrategy,
}

/// Backoff Strategies for Retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    Linear,
    Exponential,
    Constant,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryConfiguration {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Pause before retry number `attempt + 1`, capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u8) -> Duration {
        let delay = match self.backoff_strategy {
            BackoffStrategy::Linear => self.base_delay.saturating_mul(u32::from(attempt) + 1),
            BackoffStrategy::Exponential => 2u32
                .checked_pow(u32::from(attempt))
                .map_or(MAX_RETRY_DELAY, |factor| self.base_delay.saturating_mul(factor)),
            BackoffStrategy::Constant => self.base_delay,
        };
        delay.min(MAX_RETRY_DELAY)
    }
}

/// HTTP client for a running prediction API.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfiguration,
}

impl PredictionClient {
    pub fn new(base_url: impl Into<String>, retry: RetryConfiguration) -> PredictorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PredictorError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /`
    pub async fn status(&self) -> PredictorResult<StatusResponse> {
        let url = self.url("/");
        let response = self.send_with_retry(&url, || self.http.get(&url)).await?;
        decode(response).await
    }

    /// `GET /model`
    pub async fn model_info(&self) -> PredictorResult<ModelInfo> {
        let url = self.url("/model");
        let response = self.send_with_retry(&url, || self.http.get(&url)).await?;
        decode(response).await
    }

    /// `POST /predict`, returning the raw prediction in target units.
    pub async fn predict(&self, features: &[f64]) -> PredictorResult<f64> {
        let url = self.url("/predict");
        let body = PredictRequest {
            features: features.to_vec(),
        };
        let response = self
            .send_with_retry(&url, || self.http.post(&url).json(&body))
            .await?;
        let reply: PredictResponse = decode(response).await?;
        Ok(reply.prediction)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Transport failures, 5xx and 429 are retried; any other status is
    // handed back to the caller untouched.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> PredictorResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = String::new();

        for attempt in 0..=self.retry.max_retries {
            match build().send().await {
                Ok(response) if is_retryable(response.status()) => {
                    last_error = format!("server responded with {}", response.status());
                }
                Ok(response) => return Ok(response),
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.retry.max_retries {
                let delay = self.retry.delay_for(attempt);
                warn!(url, attempt, error = %last_error, ?delay, "Request failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        Err(PredictorError::Client(format!(
            "request to {url} failed after {} attempts: {last_error}",
            u32::from(self.retry.max_retries) + 1
        )))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

async fn decode<T: DeserializeOwned>(response: Response) -> PredictorResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| PredictorError::Client(format!("malformed response body: {e}")));
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };
    debug!(%status, %message, "Request rejected");

    if status == StatusCode::BAD_REQUEST {
        Err(PredictorError::InvalidInput(message))
    } else {
        Err(PredictorError::Client(format!("{status}: {message}")))
    }
}
