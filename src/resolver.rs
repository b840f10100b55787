//! The redirect state machine: resolves an effective key (plus an
//! optional password) to one of five terminal states.

use crate::cache::HotCache;
use crate::domain::Mapping;
use crate::security::PasswordGuard;
use crate::store::MappingStore;
use chrono::Utc;
use std::sync::Arc;

/// Closed, tagged union of resolve outcomes — the HTTP layer maps each
/// variant to a status code, never a cascade of exceptions.
pub enum ResolveState {
    Missing,
    Inactive,
    Expired,
    NeedsPassword,
    BadPassword,
    Open { original_url: String, mapping: Mapping },
}

pub struct Resolver {
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn HotCache>,
}

impl Resolver {
    pub fn new(store: Arc<dyn MappingStore>, cache: Arc<dyn HotCache>) -> Self {
        Self { store, cache }
    }

    /// Steps 1–6 of spec.md §4.7's algorithm.
    pub async fn resolve(&self, effective_key: &str, password: Option<&str>) -> ResolveState {
        let Ok(Some(mapping)) = self.store.find_by_effective_key(effective_key).await else {
            return ResolveState::Missing;
        };

        if mapping.is_password_protected() {
            match password {
                None => return ResolveState::NeedsPassword,
                Some(supplied) => {
                    let Some(stored) = mapping.password_hash.as_deref() else {
                        return ResolveState::NeedsPassword;
                    };
                    if !PasswordGuard::verify(supplied, stored) {
                        return ResolveState::BadPassword;
                    }
                }
            }
        }

        if !mapping.is_active {
            return ResolveState::Inactive;
        }

        let now = Utc::now();
        if mapping.is_expired_at(now) {
            self.cache.invalidate(&mapping.short_key).await;
            return ResolveState::Expired;
        }

        if !mapping.is_password_protected() {
            if let Some(cached) = self.cache.get(&mapping.short_key).await {
                return ResolveState::Open {
                    original_url: cached,
                    mapping,
                };
            }
            self.cache.put(&mapping.short_key, &mapping.original_url).await;
        }

        let original_url = mapping.original_url.clone();
        ResolveState::Open { original_url, mapping }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaHotCache;
    use crate::domain::NewMapping;
    use crate::store::SqliteStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    async fn in_memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    async fn seed(store: &SqliteStore, new: NewMapping, short_key: &str) -> i64 {
        let id = store.insert_pending(&new).await.unwrap();
        store.assign_short_key(id, short_key).await.unwrap();
        id
    }

    fn resolver(store: SqliteStore) -> Resolver {
        let cache = Arc::new(MokaHotCache::new(Duration::from_secs(3600), 1000));
        Resolver::new(Arc::new(store), cache)
    }

    #[tokio::test]
    async fn missing_key_yields_missing() {
        let store = in_memory_store().await;
        let resolver = resolver(store);
        assert!(matches!(resolver.resolve("nope", None).await, ResolveState::Missing));
    }

    #[tokio::test]
    async fn open_mapping_resolves_and_populates_cache() {
        let store = in_memory_store().await;
        seed(
            &store,
            NewMapping {
                original_url: "https://example.com/a".into(),
                alias: None,
                expires_at: None,
                password_hash: None,
                created_by_ip: None,
            },
            "abc123",
        )
        .await;
        let resolver = resolver(store);
        match resolver.resolve("abc123", None).await {
            ResolveState::Open { original_url, .. } => {
                assert_eq!(original_url, "https://example.com/a");
            }
            _ => panic!("expected Open"),
        }
    }

    #[tokio::test]
    async fn expired_mapping_invalidates_cache_and_returns_expired() {
        let store = in_memory_store().await;
        seed(
            &store,
            NewMapping {
                original_url: "https://example.com/x".into(),
                alias: None,
                expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
                password_hash: None,
                created_by_ip: None,
            },
            "expired1",
        )
        .await;
        let resolver = resolver(store);
        assert!(matches!(resolver.resolve("expired1", None).await, ResolveState::Expired));
    }

    #[tokio::test]
    async fn gated_mapping_requires_password() {
        let store = in_memory_store().await;
        let hash = PasswordGuard::hash("hunter2").unwrap();
        seed(
            &store,
            NewMapping {
                original_url: "https://secret.test".into(),
                alias: None,
                expires_at: None,
                password_hash: Some(hash),
                created_by_ip: None,
            },
            "secret1",
        )
        .await;
        let resolver = resolver(store);

        assert!(matches!(
            resolver.resolve("secret1", None).await,
            ResolveState::NeedsPassword
        ));
        assert!(matches!(
            resolver.resolve("secret1", Some("wrong")).await,
            ResolveState::BadPassword
        ));
        match resolver.resolve("secret1", Some("hunter2")).await {
            ResolveState::Open { original_url, .. } => {
                assert_eq!(original_url, "https://secret.test");
            }
            _ => panic!("expected Open"),
        }
    }
}
