//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Key used when the client address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Past this many tracked addresses, keys with a full bucket are dropped.
const MAX_TRACKED_CLIENTS: usize = 10_000;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const UNLIMITED_PER_SEC: NonZeroU32 = NonZeroU32::new(100_000).unwrap();

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts (5 burst, then 1 per second)
    pub login: Arc<IpLimiter>,
    /// Key clients by `X-Forwarded-For`. Only safe behind a proxy that sets it.
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            trust_forwarded_for: false,
        }
    }

    /// Limits high enough that tests never hit them.
    pub fn unlimited() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(UNLIMITED_PER_SEC).allow_burst(UNLIMITED_PER_SEC),
            )),
            trust_forwarded_for: false,
        }
    }

    pub fn with_trusted_proxy(mut self, trust_forwarded_for: bool) -> Self {
        self.trust_forwarded_for = trust_forwarded_for;
        self
    }

    fn prune(&self) {
        if self.login.len() > MAX_TRACKED_CLIENTS {
            self.login.retain_recent();
            self.login.shrink_to_fit();
            tracing::debug!(tracked = self.login.len(), "Pruned login rate limiter");
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, config.trust_forwarded_for)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    let allowed = config.login.check_key(&ip).is_ok();
    config.prune();

    if allowed {
        return next.run(request).await;
    }

    tracing::warn!(ip = %ip, "Login rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "Too many login attempts. Please wait before trying again." })),
    )
        .into_response()
}
