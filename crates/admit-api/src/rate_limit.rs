//! Fixed-window rate limiter middleware.
//!
//! Counts requests per wall-clock minute with two atomics. The counter
//! resets when a request lands in a new minute.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;

const WINDOW_SECS: u64 = 60;

/// Shared state for the rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    /// Maximum requests allowed per window. Zero disables limiting.
    max_per_window: u64,
    /// Requests counted in the active window.
    count: Arc<AtomicU64>,
    /// Index of the active window (epoch seconds / 60).
    window: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Allow `max_per_minute` requests per minute.
    pub fn new(max_per_minute: u64) -> Self {
        Self {
            max_per_window: max_per_minute,
            count: Arc::new(AtomicU64::new(0)),
            window: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now / WINDOW_SECS)
    }

    fn try_acquire_at(&self, window: u64) -> bool {
        if self.max_per_window == 0 {
            return true;
        }
        let current = self.window.load(Ordering::Relaxed);
        if window != current
            && self
                .window
                .compare_exchange(current, window, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.count.store(1, Ordering::Relaxed);
            return true;
        }
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        prev < self.max_per_window
    }
}

/// Axum middleware that enforces the rate limit.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        ApiError::TooManyRequests("Rate limit exceeded. Please try again in a minute.".to_string())
            .into_response()
    }
}
