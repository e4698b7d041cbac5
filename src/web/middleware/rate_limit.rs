//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use crate::web::error::ApiError;

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// State for rate limiting contact submissions.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-IP rate limiters for the contact endpoint.
    limiters: Arc<RwLock<HashMap<String, Arc<IpRateLimiter>>>>,
    /// Contact rate limit (requests per minute).
    requests_per_minute: u32,
    /// Whether forwarding headers identify the client.
    trust_proxy_headers: bool,
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            requests_per_minute,
            trust_proxy_headers: false,
        }
    }

    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket address. Any client can set these headers, so this is only
    /// safe behind a proxy that overwrites them.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Get or create a rate limiter for the given IP.
    fn limiter_for(&self, ip: &str) -> Arc<IpRateLimiter> {
        {
            let read_guard = self.limiters.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(limiter) = read_guard.get(ip) {
                return limiter.clone();
            }
        }

        let mut write_guard = self.limiters.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check after acquiring write lock
        if let Some(limiter) = write_guard.get(ip) {
            return limiter.clone();
        }

        let quota =
            Quota::per_minute(NonZeroU32::new(self.requests_per_minute).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        write_guard.insert(ip.to_string(), limiter.clone());
        limiter
    }

    /// Check if a contact submission is allowed for the given IP.
    pub fn check(&self, ip: &str) -> bool {
        self.limiter_for(ip).check().is_ok()
    }

    /// Number of tracked clients.
    pub fn tracked(&self) -> usize {
        self.limiters.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop limiters that are not currently borrowed by a request.
    pub fn cleanup(&self) {
        let mut guard = self.limiters.write().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|_, v| Arc::strong_count(v) > 1);
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

/// Extract client IP from request.
///
/// Forwarding headers are only read when `trust_proxy_headers` is set.
fn client_ip(req: &Request<Body>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
        {
            // First hop is the original client
            if let Some(ip) = forwarded.split(',').next() {
                return ip.trim().to_string();
            }
        }

        if let Some(real_ip) = req
            .headers()
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
        {
            return real_ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for the contact endpoint.
pub async fn contact_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req, state.trust_proxy_headers);

    if !state.check(&ip) {
        tracing::warn!(ip = %ip, "Contact rate limit exceeded");
        return ApiError::too_many_requests("Too many submissions. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
