/// Rate limiting middleware for `/api/v1`
///
/// One in-process token bucket guards the whole API:
/// - Tokens refill at a constant rate up to the bucket capacity
/// - Each request consumes 1 token
/// - A request arriving at an empty bucket is rejected with 429
///
/// # Headers
///
/// - `X-RateLimit-Limit`: Bucket capacity
/// - `X-RateLimit-Remaining`: Whole tokens left after this request
/// - `Retry-After`: Seconds until a token is available (429 responses only)

use std::sync::Mutex;
use std::time::Instant;

use axum::{
    extract::{OriginalUri, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Token bucket state
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill instant
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, now: Instant, rate: f64, capacity: u32) {
        let elapsed_secs = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed_secs * rate).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume N tokens
    fn try_consume(&mut self, count: f64) -> bool {
        if self.tokens >= count {
            self.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Calculates seconds until N tokens are available
    fn seconds_until_available(&self, count: f64, rate: f64) -> u64 {
        let deficit = count - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: u64 },
}

/// Shared limiter holding the single bucket
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = TokenBucket::new(config.capacity, Instant::now());
        Self {
            config,
            bucket: Mutex::new(bucket),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Takes one token if available
    pub fn check(&self) -> RateLimitDecision {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> RateLimitDecision {
        let mut bucket = self.bucket.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let rate = self.config.refill_per_second;

        bucket.refill(now, rate, self.config.capacity);

        if bucket.try_consume(1.0) {
            RateLimitDecision::Allowed {
                remaining: bucket.tokens.floor() as u32,
            }
        } else {
            RateLimitDecision::Limited {
                retry_after: bucket.seconds_until_available(1.0, rate).max(1),
            }
        }
    }
}

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: bucket empty
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limiter = &state.rate_limiter;
    if !limiter.enabled() {
        return Ok(next.run(request).await);
    }

    match limiter.check() {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;

            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.capacity()));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));

            Ok(response)
        }
        RateLimitDecision::Limited { retry_after } => {
            let path = request
                .extensions()
                .get::<OriginalUri>()
                .map(|uri| uri.path().to_string())
                .unwrap_or_else(|| request.uri().path().to_string());

            tracing::warn!(path = %path, retry_after, "Rate limit exceeded");

            Err(ApiError::RateLimitExceeded {
                retry_after,
                message: format!("Rate limit exceeded. Try again in {} seconds", retry_after),
                path,
            })
        }
    }
}
