// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-IP fixed-window rate limiting.
//!
//! Clients are keyed on the socket peer; `X-Forwarded-For` is honoured only
//! when `TRUST_PROXY` is enabled.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bucket count above which expired windows are swept on insert.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per key within a fixed window.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    buckets: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: DashMap::new(),
        }
    }

    /// Record one request for `key`.
    ///
    /// Returns the time until the window resets when the limit is exceeded.
    pub fn check(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let mut entry = self.buckets.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(entry.started);
            return Err(self.window.saturating_sub(elapsed));
        }

        entry.count += 1;
        Ok(())
    }

    fn prune(&self, now: Instant) {
        let window = self.window;
        self.buckets
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    fn enforce(&self, key: &str) -> Result<(), AppError> {
        self.check(key, Instant::now()).map_err(|wait| {
            tracing::warn!(client = %key, "Rate limit exceeded");
            AppError::RateLimited {
                retry_after_secs: retry_after_secs(wait),
            }
        })
    }
}

/// Whole seconds to advertise in `Retry-After`, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Client address used as the rate-limit key.
///
/// The socket peer is used unless `trust_proxy` is set, in which case the
/// first `X-Forwarded-For` hop takes precedence.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    };

    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn request_client_ip(request: &Request, trust_proxy: bool) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_ip(request.headers(), peer, trust_proxy)
}

/// General limiter applied to every `/api` route.
pub async fn limit_api(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request_client_ip(&request, state.config.trust_proxy);
    state.api_limiter.enforce(&client)?;
    Ok(next.run(request).await)
}

/// Stricter limiter for analysis generation.
pub async fn limit_analysis(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request_client_ip(&request, state.config.trust_proxy);
    state.analysis_limiter.enforce(&client)?;
    Ok(next.run(request).await)
}
