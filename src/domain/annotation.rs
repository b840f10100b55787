//! Content-addressed cache of LLM output, keyed by `SHA-256(original_url)`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// The fixed category taxonomy the LLM prompt is constrained to.
pub const CATEGORY_TAXONOMY: &[&str] = &[
    "Technology",
    "News",
    "Entertainment",
    "Education",
    "Business",
    "Social",
    "Shopping",
    "Health",
    "Travel",
    "Finance",
    "Sports",
    "Other",
];

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Annotation {
    pub url_hash: String,
    pub original_url: String,
    pub summary: String,
    pub category: String,
    pub tags: String,
    pub safety_score: f64,
    pub is_safe: bool,
    pub safety_reasons: String,
    pub analyzed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Annotation {
    /// `isExpired()` is the only predicate callers should consult.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn tags_vec(&self) -> Vec<String> {
        split_csv(&self.tags)
    }

    pub fn safety_reasons_vec(&self) -> Vec<String> {
        split_csv(&self.safety_reasons)
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parsed, validated, and sanitized LLM output — produced by
/// [`crate::llm::parse`] before being upserted as an [`Annotation`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmAnalysis {
    pub summary: String,
    pub category: String,
    pub tags: Vec<String>,
    pub safety_score: f64,
    pub is_safe: bool,
    pub safety_reasons: Vec<String>,
    pub alias_suggestions: Vec<String>,
}

/// Result of [`crate::llm::LlmClient::analyze`]: the analysis plus whether
/// it was served from the annotation cache.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationResult {
    pub analysis: LlmAnalysis,
    pub from_cache: bool,
}
