//! Rate-limit interceptor scoped to the redirect path only, per
//! spec.md §4.4: API endpoints are unrestricted.

use crate::ratelimit::extract_client_ip;
use crate::state::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

pub async fn rate_limit_redirects(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let forwarded_for = header_str(&request, "x-forwarded-for");
    let real_ip = header_str(&request, "x-real-ip");
    let client_ip = extract_client_ip(forwarded_for.as_deref(), real_ip.as_deref(), Some(peer));

    let decision = state.rate_limiter.check(&client_ip);

    if !decision.admitted {
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        insert_rate_limit_headers(&mut response, &decision);
        if let Ok(v) = HeaderValue::from_str(&decision.reset_in_seconds.to_string()) {
            response.headers_mut().insert("Retry-After", v);
        }
        insert_cache_control(&mut response);
        return response;
    }

    let mut response = next.run(request).await;
    insert_rate_limit_headers(&mut response, &decision);
    insert_cache_control(&mut response);
    response
}

fn insert_cache_control(response: &mut Response) {
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-cache, no-store, must-revalidate"));
}

fn insert_rate_limit_headers(response: &mut Response, decision: &crate::ratelimit::RateLimitDecision) {
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.reset_in_seconds.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}

fn header_str<B>(request: &Request<B>, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
