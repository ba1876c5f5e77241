//! Request logging and rate limiting middleware

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, time::Instant};
use tracing::info;

use crate::{
    error::ApiError,
    rate_limiter::{Decision, RateLimiter},
};

/// Key used for clients whose address is not known
const UNKNOWN_CLIENT: &str = "unknown";

fn client_key(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Log every request with its method, path, status and latency
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{} {}",
        method,
        path
    );

    response
}

/// Reject clients that exceeded their request quota
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match limiter.check(&client_key(&req)).await {
        Decision::Allowed { .. } => next.run(req).await,
        Decision::Limited { retry_after } => ApiError::TooManyRequests {
            retry_after_secs: retry_after.as_secs().max(1),
        }
        .into_response(),
    }
}
