use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, ScienceError};

// ─── Clock ────────────────────────────────────────────────────────────────────

/// Time source for the rate limiter; swapped for a manual clock in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}

// ─── RateLimiter ──────────────────────────────────────────────────────────────

/// Minimum spacing between calls to one registry.
///
/// `wait` holds the lock while sleeping, so concurrent callers are released
/// one interval apart. The first call after construction is not delayed.
pub struct RateLimiter {
    min_interval: Duration,
    last_access: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_access: Mutex::new(None),
            clock,
        }
    }

    /// Sleep until `min_interval` has passed since the previous call, then
    /// record this call's start.
    pub async fn wait(&self) {
        let mut last = self.last_access.lock().await;
        if let Some(t) = *last {
            let elapsed = self.clock.now().saturating_duration_since(t);
            if elapsed < self.min_interval {
                self.clock.sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(self.clock.now());
    }
}

// ─── RateLimitedClient ────────────────────────────────────────────────────────

pub struct RateLimitedClient {
    client: reqwest::Client,
    limiter: Option<Arc<RateLimiter>>,
    max_retries: u32,
}

impl RateLimitedClient {
    /// A client with no rate limit; attach one with [`Self::with_limiter`].
    pub fn new(max_retries: u32, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            limiter: None,
            max_retries,
        })
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }
    }

    /// Backoff sleeps run on the limiter's clock when there is one.
    async fn back_off(&self, duration: Duration) {
        match &self.limiter {
            Some(limiter) => limiter.clock.sleep(duration).await,
            None => sleep(duration).await,
        }
    }

    pub async fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(url, attempt, "GET");
            let resp = self.client.get(url).query(query).send().await;
            match resp {
                Ok(r) if r.status() == 429 => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    if attempt >= self.max_retries {
                        return Err(ScienceError::RateLimit(url.to_string(), wait));
                    }
                    warn!(url, wait, "rate limited, backing off");
                    self.back_off(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ScienceError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(ScienceError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ScienceError::Http(e));
                    }
                    warn!(url, error = %e, "request failed, retrying");
                    let backoff = 2u64.pow(attempt);
                    self.back_off(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }
}
