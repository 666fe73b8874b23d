//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address for per-IP limiting.
///
/// With `trust_forwarded_for` set, prefers the first hop of `X-Forwarded-For`.
/// Otherwise the header is ignored. Falls back to
/// the socket address from `ConnectInfo`. Returns `None` if neither is available.
pub fn extract_client_ip<B>(request: &Request<B>, trust_forwarded_for: bool) -> Option<String> {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
