use super::HotCache;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// `moka` itself cannot error on get/insert/invalidate, so "fail soft on
/// backing-store error" degrades here to "moka is always available" —
/// the trait still returns plain values rather than `Result` for the
/// in-process case, but a remote-cache implementation could surface
/// failures by simply treating them as a miss/no-op.
pub struct MokaHotCache {
    inner: Cache<String, String>,
}

impl MokaHotCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_entries)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl HotCache for MokaHotCache {
    async fn get(&self, short_key: &str) -> Option<String> {
        self.inner.get(short_key).await
    }

    async fn put(&self, short_key: &str, original_url: &str) {
        self.inner.insert(short_key.to_string(), original_url.to_string()).await;
    }

    async fn invalidate(&self, short_key: &str) {
        self.inner.invalidate(short_key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_hits() {
        let cache = MokaHotCache::new(Duration::from_secs(60), 100);
        cache.put("abc123", "https://example.com").await;
        assert_eq!(cache.get("abc123").await.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = MokaHotCache::new(Duration::from_secs(60), 100);
        cache.put("abc123", "https://example.com").await;
        cache.invalidate("abc123").await;
        assert_eq!(cache.get("abc123").await, None);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = MokaHotCache::new(Duration::from_secs(60), 100);
        assert_eq!(cache.get("nope").await, None);
    }
}
