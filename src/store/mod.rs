//! Durable persistence for mappings, click events, and annotations.
//! Two backends implement the same three traits: SQLite (dev/tests) and
//! Postgres (production), mirroring the teacher's dual-database split.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::domain::{Annotation, Mapping, NewClickEvent, NewMapping};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Connection(String),
    Query(String),
    Migration(String),
    NotFound,
    Duplicate,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "store connection error: {msg}"),
            StoreError::Query(msg) => write!(f, "store query error: {msg}"),
            StoreError::Migration(msg) => write!(f, "store migration error: {msg}"),
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Duplicate => write!(f, "duplicate key"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Indexed on (short_key), (alias), (is_active, created_at DESC), (ai_category).
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Inserts a row without a short key assigned yet (the key is minted
    /// only once an id exists, per the creation sequence in spec.md
    /// §4.9). Returns the new row's id.
    async fn insert_pending(&self, new: &NewMapping) -> Result<i64, StoreError>;

    /// Assigns the minted short key to a pending row. Fails with
    /// `StoreError::Duplicate` if the key collides.
    async fn assign_short_key(&self, id: i64, short_key: &str) -> Result<(), StoreError>;

    async fn find_by_effective_key(&self, key: &str) -> Result<Option<Mapping>, StoreError>;

    /// Looked up by primary key. Used by the background re-analysis task,
    /// which only carries a mapping id forward, not its effective key.
    async fn find_by_id(&self, id: i64) -> Result<Option<Mapping>, StoreError>;

    async fn exists_short_key(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists_alias(&self, alias: &str) -> Result<bool, StoreError>;

    async fn increment_clicks(&self, short_key: &str) -> Result<(), StoreError>;

    /// Sets `is_active=false` where `expires_at < now AND is_active=true`.
    /// Returns the number of rows flipped.
    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<Mapping>, StoreError>;

    /// Persists the metadata/AI decorations on an already-created mapping.
    async fn update_decorations(&self, mapping: &Mapping) -> Result<(), StoreError>;
}

/// Basic per-mapping counters for the stats endpoint.
pub struct ClickStats {
    pub total_clicks: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

/// Breakdown counts for the analytics endpoint.
pub struct ClickAnalytics {
    pub by_country: Vec<(String, i64)>,
    pub by_device: Vec<(String, i64)>,
    pub by_browser: Vec<(String, i64)>,
}

#[async_trait]
pub trait ClickStore: Send + Sync {
    async fn insert(&self, event: &NewClickEvent) -> Result<(), StoreError>;

    async fn stats(&self, mapping_id: i64) -> Result<ClickStats, StoreError>;

    async fn analytics(&self, mapping_id: i64) -> Result<ClickAnalytics, StoreError>;
}

#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn find(&self, url_hash: &str) -> Result<Option<Annotation>, StoreError>;

    /// Last-writer-wins upsert, per spec.md §5's shared-state notes.
    async fn upsert(&self, annotation: &Annotation) -> Result<(), StoreError>;
}

/// A backend implements all three stores behind one handle so `AppState`
/// can hold a single `Arc<dyn Store>`.
pub trait Store: MappingStore + ClickStore + AnnotationStore {}
impl<T: MappingStore + ClickStore + AnnotationStore> Store for T {}
