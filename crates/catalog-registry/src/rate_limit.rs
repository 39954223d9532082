//! Per-client request rate limiting.
//!
//! # Rust Learning Note
//!
//! ## Keyed Rate Limiters
//!
//! `governor` implements GCRA, a token-bucket equivalent that stores one
//! timestamp per key. A keyed limiter holds one bucket per client address:
//!
//! ```rust,ignore
//! let limiter = RateLimiter::keyed(Quota::per_minute(nonzero!(80u32)));
//! limiter.check_key(&client_ip)?;   // Err(NotUntil) when over quota
//! ```
//!
//! The peer address comes from axum's `ConnectInfo`, which the server only
//! provides for TCP listeners. Requests without it (Unix sockets) share
//! one bucket keyed by the unspecified address.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use catalog_common::MessageResponse;
use governor::clock::Clock;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

/// Default quota per client address.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 80;

/// Tracked clients above which idle buckets are purged.
const PURGE_THRESHOLD: usize = 10_000;

/// Rate limiter keyed by client IP address.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    per_minute: NonZeroU32,
}

impl ClientRateLimiter {
    pub fn per_minute(per_minute: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            per_minute,
        }
    }

    pub fn quota(&self) -> NonZeroU32 {
        self.per_minute
    }

    /// Takes one request from `client`'s quota, or returns how long to wait.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        let result = self
            .limiter
            .check_key(&client)
            .map_err(|not_until| not_until.wait_time_from(self.limiter.clock().now()));

        if self.limiter.len() > PURGE_THRESHOLD {
            self.limiter.retain_recent();
        }
        result
    }
}

/// Rejects requests over quota with 429 and a `Retry-After` header.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<ClientRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            warn!("Rate limit exceeded for {} ({}/min)", client, limiter.quota());
            // Round up so clients never retry a moment too early.
            let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(MessageResponse::new("rate limit exceeded")),
            )
                .into_response()
        }
    }
}
