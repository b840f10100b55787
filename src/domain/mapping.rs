//! The `Mapping` record: identity, target, lifecycle, access control, and
//! the decorations written post-creation by the metadata and AI pipelines.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A short key or alias, plus the original URL it resolves to, along with
/// every piece of state the resolver and the enrichment pipelines need.
///
/// `short_key` is system-minted and always present. `alias`, if present,
/// is the effective key clients are expected to use; `effective_key()`
/// picks whichever applies.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Mapping {
    pub id: i64,
    pub short_key: String,
    pub alias: Option<String>,
    pub original_url: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub click_count: i64,

    pub password_hash: Option<String>,

    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_image_url: Option<String>,
    pub meta_favicon_url: Option<String>,
    pub meta_fetched_at: Option<DateTime<Utc>>,

    pub ai_summary: Option<String>,
    pub ai_category: Option<String>,
    pub ai_tags: Option<String>,
    pub ai_safety_score: Option<f64>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,

    /// Audit-only: the creator's snapshot IP. Never consulted by resolution.
    pub created_by_ip: Option<String>,
}

impl Mapping {
    /// The alias if set, else the short key — the identifier clients use
    /// in the public short URL and the one resolution must accept.
    pub fn effective_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.short_key)
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// `expires_at` equal to `now` counts as expired — boundary is inclusive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    pub fn ai_tags_vec(&self) -> Vec<String> {
        self.ai_tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Input to `MappingStore::insert` — everything known before a short key
/// has been minted and assigned.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub original_url: String,
    pub alias: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
    pub created_by_ip: Option<String>,
}
