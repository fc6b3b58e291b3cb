use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::clock::Clock;

/// Upper bound on tracked clients before the oldest windows are evicted.
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow { remaining: u32, reset_secs: i64 },
    Reject { retry_after_secs: i64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
///
/// Windows live in a sharded map. Once `capacity` clients are tracked, expired
/// windows are dropped first, then the oldest live ones.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    capacity: usize,
    trust_proxy: bool,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::minutes(15)),
            capacity: MAX_TRACKED_CLIENTS,
            trust_proxy: false,
            clock,
            windows: DashMap::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Honour `X-Forwarded-For` when deriving the client key.
    pub fn trusting_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn check(&self, client: &str) -> RateDecision {
        let now = self.clock.now();

        if !self.windows.contains_key(client) && self.windows.len() >= self.capacity {
            self.make_room(now);
        }

        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now >= entry.started + self.window {
            *entry = Window { started: now, count: 0 };
        }

        let reset_secs = (entry.started + self.window - now).num_seconds().max(0);
        if entry.count >= self.max_requests {
            return RateDecision::Reject {
                retry_after_secs: reset_secs,
            };
        }

        entry.count += 1;
        RateDecision::Allow {
            remaining: self.max_requests - entry.count,
            reset_secs,
        }
    }

    /// Frees at least a tenth of the table so eviction runs once per batch of new clients.
    fn make_room(&self, now: DateTime<Utc>) {
        let window = self.window;
        self.windows.retain(|_, entry| now < entry.started + window);

        let target = self.capacity - (self.capacity / 10).max(1);
        if self.windows.len() <= target {
            return;
        }

        let mut live: Vec<(DateTime<Utc>, String)> = self
            .windows
            .iter()
            .map(|entry| (entry.value().started, entry.key().clone()))
            .collect();
        live.sort_unstable();

        let excess = live.len().saturating_sub(target);
        for (_, client) in live.into_iter().take(excess) {
            self.windows.remove(&client);
        }
        debug!(evicted = excess, "rate limit table at capacity");
    }
}

/// Peer address, or the first `X-Forwarded-For` hop when the proxy is trusted.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Throttles `/api` paths; everything else passes straight through.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path != "/api" && !path.starts_with("/api/") {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, limiter.trust_proxy);

    match limiter.check(&client) {
        RateDecision::Allow {
            remaining,
            reset_secs,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max_requests()));
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            headers.insert(RESET_HEADER, HeaderValue::from(reset_secs));
            response
        }
        RateDecision::Reject { retry_after_secs } => {
            warn!(client = %client, "rate limit exceeded");
            let mut response = ApiError::TooManyRequests.into_response();
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max_requests()));
            headers.insert(REMAINING_HEADER, HeaderValue::from(0u32));
            headers.insert(RESET_HEADER, HeaderValue::from(retry_after_secs));
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
            response
        }
    }
}
