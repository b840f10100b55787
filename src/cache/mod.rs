//! The hot cache: a TTL-bounded short-key → original-URL map, keyed by
//! the system-minted short key only (never by alias).

mod moka_cache;

pub use moka_cache::MokaHotCache;

use async_trait::async_trait;

#[async_trait]
pub trait HotCache: Send + Sync {
    async fn get(&self, short_key: &str) -> Option<String>;
    async fn put(&self, short_key: &str, original_url: &str);
    async fn invalidate(&self, short_key: &str);
}
