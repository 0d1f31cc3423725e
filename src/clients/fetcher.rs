//! Outbound JSON fetching under a shared rate limit and a bounded retry policy.
//!
//! Every catalog request goes through [`ResilientFetcher`]. The limiter is
//! shared by all clones of a fetcher, so concurrent callers contend for the
//! same permits. Whether a failure is terminal ("not found") or transient is
//! decided here, once, and surfaced as a [`FetchError`] variant.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use governor::{
    Quota,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FetcherConfig;
use crate::constants::catalog::NOT_FOUND_STATUS_CODE;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Rate limit permit not acquired within {waited:?}")]
    RateLimited { waited: Duration },

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Raw response as seen by the fetcher.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// A network or I/O failure below the HTTP layer. Always retryable.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Performs a single GET. Implemented over reqwest in production and by
/// scripted doubles in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(Duration::from_secs(config.request_timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GCRA permit gate shared by every clone of a fetcher.
///
/// Cells are spaced `refresh_period / limit_for_period` apart, so no window
/// of one refresh period ever holds more than `limit_for_period` requests
/// when the burst is 1.
#[derive(Clone)]
pub struct SharedLimiter {
    limiter: Arc<DirectLimiter>,
    timeout: Duration,
}

impl SharedLimiter {
    #[must_use]
    pub fn new(config: &FetcherConfig) -> Self {
        let limit = config.limit_for_period.max(1);
        let period = Duration::from_millis(config.limit_refresh_period_ms) / limit;
        let burst = NonZeroU32::new(config.limit_burst.clamp(1, limit)).unwrap_or(NonZeroU32::MIN);

        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(governor::RateLimiter::direct(quota)),
            timeout: Duration::from_millis(config.rate_limit_timeout_ms),
        }
    }

    /// Waits for one permit, giving up once the timeout elapses.
    pub async fn acquire(&self) -> Result<(), FetchError> {
        if tokio::time::timeout(self.timeout, self.limiter.until_ready())
            .await
            .is_err()
        {
            metrics::counter!("dramawatch_rate_limited_total").increment(1);
            return Err(FetchError::RateLimited {
                waited: self.timeout,
            });
        }
        Ok(())
    }
}

/// Exponential backoff between attempts: base, base * multiplier, ...,
/// capped at the configured maximum. `max_attempts` counts the first try.
#[must_use]
pub fn backoff(config: &FetcherConfig) -> ExponentialBuilder {
    #[allow(clippy::cast_possible_truncation)]
    let factor = config.backoff_multiplier as f32;
    let retries = usize::try_from(config.max_attempts.max(1) - 1).unwrap_or(usize::MAX);

    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.backoff_base_ms))
        .with_factor(factor)
        .with_max_delay(Duration::from_millis(config.backoff_max_ms))
        .with_max_times(retries)
}

#[derive(Debug)]
enum AttemptError {
    Retryable(String),
    Terminal(FetchError),
}

impl AttemptError {
    const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retryable(message) => f.write_str(message),
            Self::Terminal(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    limiter: SharedLimiter,
    backoff: ExponentialBuilder,
}

impl ResilientFetcher {
    #[must_use]
    pub fn new(config: &FetcherConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new(config)))
    }

    #[must_use]
    pub fn with_transport(config: &FetcherConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            limiter: SharedLimiter::new(config),
            backoff: backoff(config),
        }
    }

    /// Fetches and parses a JSON document.
    ///
    /// Every attempt takes its own permit from the shared limiter, so retries
    /// count against the rate limit like any other request.
    pub async fn fetch(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let this = self;

        let outcome = (move || async move {
            counter.fetch_add(1, Ordering::Relaxed);
            this.limiter.acquire().await.map_err(AttemptError::Terminal)?;
            metrics::counter!("dramawatch_fetch_attempts_total").increment(1);
            this.attempt(url).await
        })
        .retry(self.backoff.clone())
        .sleep(tokio::time::sleep)
        .when(AttemptError::is_retryable)
        .notify(|e: &AttemptError, wait: Duration| {
            debug!(
                url = %redact(url),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %e,
                "Retrying request"
            );
        })
        .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(AttemptError::Terminal(e)) => Err(e),
            Err(AttemptError::Retryable(message)) => {
                let attempts = attempts.load(Ordering::Relaxed);
                warn!(url = %redact(url), attempts, error = %message, "Giving up on request");
                Err(FetchError::RetriesExhausted {
                    attempts,
                    last_error: message,
                })
            }
        }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let value = self.fetch(url).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            url: redact(url),
            message: e.to_string(),
        })
    }

    async fn attempt(&self, url: &str) -> Result<serde_json::Value, AttemptError> {
        let response = self
            .transport
            .get(url)
            .await
            .map_err(|e| AttemptError::Retryable(e.0))?;

        classify(url, response)
    }
}

/// Decides once whether a response is a payload, a terminal failure or a
/// retryable one.
fn classify(url: &str, response: TransportResponse) -> Result<serde_json::Value, AttemptError> {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();

    let reports_not_found = parsed
        .as_ref()
        .and_then(|body| body.get("status_code"))
        .and_then(serde_json::Value::as_i64)
        == Some(NOT_FOUND_STATUS_CODE);

    if response.status == 404 || reports_not_found {
        return Err(AttemptError::Terminal(FetchError::NotFound { url: redact(url) }));
    }

    if response.status == 429 || response.status >= 500 {
        return Err(AttemptError::Retryable(format!(
            "HTTP {}",
            response.status
        )));
    }

    if !(200..300).contains(&response.status) {
        return Err(AttemptError::Terminal(FetchError::Status {
            status: response.status,
            url: redact(url),
        }));
    }

    parsed.ok_or_else(|| {
        AttemptError::Terminal(FetchError::Decode {
            url: redact(url),
            message: "response body is not valid JSON".to_string(),
        })
    })
}

/// Strips the API key from URLs before they reach logs or errors.
fn redact(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();

    if pairs.is_empty() {
        return parsed.to_string();
    }

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
