//! Per-client fixed-window admission control for the redirect path only.
//! API endpoints are unrestricted (spec.md §4.4).

mod dashmap_store;

pub use dashmap_store::DashMapCounterStore;

use std::sync::Arc;

/// The shared counter primitive `RateLimiter` is built on. Swappable for a
/// remote store (e.g. Redis) without touching callers — the spec's
/// "single shared counter store" assumption is an implementation detail
/// of whichever `CounterStore` is wired in.
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter for `key`, starting a fresh
    /// `window_secs`-long window if this is the first hit. Returns the
    /// post-increment count, or `None` if the store is unreachable.
    fn increment(&self, key: &str, window_secs: u64) -> Option<u64>;

    /// Requests remaining in the current window without mutating state.
    /// `None` if the store is unreachable or the key has no window yet.
    fn remaining(&self, key: &str, limit: u64) -> Option<u64>;

    /// Seconds until the current window resets. `None` under the same
    /// conditions as `remaining`.
    fn reset_in_seconds(&self, key: &str) -> Option<u64>;
}

pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_in_seconds: u64,
}

/// Orchestrates admission control: increments the per-IP counter and
/// reports the values the HTTP layer turns into `X-RateLimit-*` headers.
/// Fails open (admits, logs a WARN) if the counter store is unreachable.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    window_secs: u64,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, window_secs: u64, max_requests: u64) -> Self {
        Self {
            store,
            window_secs,
            max_requests,
        }
    }

    pub fn check(&self, client_ip: &str) -> RateLimitDecision {
        let key = format!("rate:{client_ip}");
        match self.store.increment(&key, self.window_secs) {
            Some(count) => {
                let remaining = self.max_requests.saturating_sub(count);
                let reset = self.store.reset_in_seconds(&key).unwrap_or(self.window_secs);
                RateLimitDecision {
                    admitted: count <= self.max_requests,
                    limit: self.max_requests,
                    remaining,
                    reset_in_seconds: reset,
                }
            }
            None => {
                tracing::warn!(ip = client_ip, "rate limit counter store unreachable, failing open");
                RateLimitDecision {
                    admitted: true,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_in_seconds: self.window_secs,
                }
            }
        }
    }
}

/// Honours `X-Forwarded-For` (first element), then `X-Real-IP`, then the
/// socket peer address.
pub fn extract_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<std::net::SocketAddr>,
) -> String {
    if let Some(xff) = forwarded_for
        && let Some(first) = xff.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_string();
    }
    if let Some(ip) = real_ip
        && !ip.trim().is_empty()
    {
        return ip.trim().to_string();
    }
    peer.map(|p| p.ip().to_string()).unwrap_or_else(|| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_forwarded_for() {
        let ip = extract_client_ip(Some("1.2.3.4, 5.6.7.8"), Some("9.9.9.9"), None);
        assert_eq!(ip, "1.2.3.4");
    }

    #[test]
    fn extract_falls_back_to_real_ip() {
        let ip = extract_client_ip(None, Some("9.9.9.9"), None);
        assert_eq!(ip, "9.9.9.9");
    }

    #[test]
    fn extract_falls_back_to_peer() {
        let peer: std::net::SocketAddr = "127.0.0.1:1234".parse().unwrap();
        let ip = extract_client_ip(None, None, Some(peer));
        assert_eq!(ip, "127.0.0.1");
    }
}
