//! Orchestrates mapping creation: validation, key minting, best-effort
//! metadata/AI enrichment, and cache warm-up, per spec.md §4.9's
//! ten-step `create` sequence.

use crate::cache::HotCache;
use crate::domain::{Mapping, NewMapping};
use crate::errors::ApiError;
use crate::keygen::KeyMinter;
use crate::llm::LlmClient;
use crate::metadata::MetadataFetcher;
use crate::security::PasswordGuard;
use crate::store::{MappingStore, StoreError};
use crate::validation::{validate_alias, validate_url};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const MAX_MINT_ATTEMPTS: u32 = 10;
const ESCALATED_KEY_LEN: usize = crate::keygen::ESCALATED_KEY_LEN;
const MAX_BULK_ITEMS: usize = 100;

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub fetch_metadata: bool,
    pub enable_ai_analysis: bool,
    pub generate_qr_code: bool,
    pub created_by_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateResponse {
    pub mapping: Mapping,
    pub short_url: String,
    pub generate_qr_code: bool,
}

#[derive(Debug, Clone)]
pub struct BulkFailure {
    pub index: usize,
    pub original_url: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BulkItemOverrides {
    pub fetch_metadata: Option<bool>,
    pub enable_ai_analysis: Option<bool>,
}

pub struct Shortener {
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn HotCache>,
    minter: Arc<dyn KeyMinter>,
    metadata: Arc<MetadataFetcher>,
    llm: Arc<LlmClient>,
    base_url: String,
}

impl Shortener {
    pub fn new(
        store: Arc<dyn MappingStore>,
        cache: Arc<dyn HotCache>,
        minter: Arc<dyn KeyMinter>,
        metadata: Arc<MetadataFetcher>,
        llm: Arc<LlmClient>,
        base_url: String,
    ) -> Self {
        Self {
            store,
            cache,
            minter,
            metadata,
            llm,
            base_url,
        }
    }

    pub async fn create(&self, request: CreateRequest) -> Result<CreateResponse, ApiError> {
        // 1. Validate URL.
        let original_url = validate_url(&request.original_url)?;

        // 2. Alias collision / format check.
        if let Some(alias) = &request.custom_alias {
            validate_alias(alias)?;
            let taken = self.store.exists_alias(alias).await.map_err(store_err)?
                || self.store.exists_short_key(alias).await.map_err(store_err)?;
            if taken {
                return Err(ApiError::DuplicateAlias(alias.clone()));
            }
        }

        // 3. Password validate + hash.
        let password_hash = match &request.password {
            Some(p) => Some(PasswordGuard::hash(p)?),
            None => None,
        };

        // 4. Insert pending row.
        let new_mapping = NewMapping {
            original_url: original_url.clone(),
            alias: request.custom_alias.clone(),
            expires_at: request.expires_at,
            password_hash,
            created_by_ip: request.created_by_ip.clone(),
        };
        let id = self.store.insert_pending(&new_mapping).await.map_err(store_err)?;

        // 5. Mint and assign a unique short key.
        let short_key = self.mint_unique_key().await?;
        self.store
            .assign_short_key(id, &short_key)
            .await
            .map_err(store_err)?;

        let mut mapping = self
            .store
            .find_by_effective_key(&short_key)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ApiError::Internal("mapping vanished immediately after insert".into()))?;

        // 6. Best-effort metadata fetch.
        if request.fetch_metadata {
            let meta = self.metadata.fetch(&original_url).await;
            mapping.meta_title = meta.title;
            mapping.meta_description = meta.description;
            mapping.meta_image_url = meta.image;
            mapping.meta_favicon_url = meta.favicon;
            mapping.meta_fetched_at = Some(Utc::now());
        }

        // 7. Synchronous AI pass, fronted by the annotation cache; never
        // fails creation. A background re-analysis is dispatched
        // regardless, to pick up a cold-cache miss that completed after
        // this request returned.
        if request.enable_ai_analysis {
            let result = self
                .llm
                .analyze(
                    &original_url,
                    mapping.meta_title.as_deref(),
                    mapping.meta_description.as_deref(),
                )
                .await;

            if !result.from_cache {
                mapping.ai_summary = Some(result.analysis.summary.clone());
                mapping.ai_category = Some(result.analysis.category.clone());
                mapping.ai_tags = Some(result.analysis.tags.join(","));
                mapping.ai_safety_score = Some(result.analysis.safety_score);
                mapping.ai_analyzed_at = Some(Utc::now());
            }

            self.spawn_background_reanalysis(mapping.id, original_url.clone());
        }

        // 8. Persist decorations.
        self.store.update_decorations(&mapping).await.map_err(store_err)?;

        // 9. Warm the cache unless the mapping is gated.
        if !mapping.is_password_protected() {
            self.cache.put(&mapping.short_key, &mapping.original_url).await;
        }

        // 10. Build the response.
        let short_url = format!("{}/{}", self.base_url.trim_end_matches('/'), mapping.effective_key());
        Ok(CreateResponse {
            mapping,
            short_url,
            generate_qr_code: request.generate_qr_code,
        })
    }

    pub async fn create_bulk(
        &self,
        requests: Vec<CreateRequest>,
        overrides: BulkItemOverrides,
    ) -> (Vec<CreateResponse>, Vec<BulkFailure>) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for (index, mut request) in requests.into_iter().enumerate().take(MAX_BULK_ITEMS) {
            if let Some(fetch_metadata) = overrides.fetch_metadata {
                request.fetch_metadata = fetch_metadata;
            }
            if let Some(enable_ai_analysis) = overrides.enable_ai_analysis {
                request.enable_ai_analysis = enable_ai_analysis;
            }

            let original_url = request.original_url.clone();
            match self.create(request).await {
                Ok(response) => successes.push(response),
                Err(e) => failures.push(BulkFailure {
                    index,
                    original_url,
                    error_message: e.to_string(),
                }),
            }
        }

        (successes, failures)
    }

    /// Up to 10 attempts at default length, escalating to a longer key
    /// on exhaustion and retrying until unique.
    async fn mint_unique_key(&self) -> Result<String, ApiError> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate = self.minter.mint();
            if !self.key_taken(&candidate).await? {
                return Ok(candidate);
            }
        }

        loop {
            let candidate = self.minter.mint_of_length(ESCALATED_KEY_LEN);
            if !self.key_taken(&candidate).await? {
                return Ok(candidate);
            }
        }
    }

    async fn key_taken(&self, candidate: &str) -> Result<bool, ApiError> {
        let short_key_taken = self.store.exists_short_key(candidate).await.map_err(store_err)?;
        let alias_taken = self.store.exists_alias(candidate).await.map_err(store_err)?;
        Ok(short_key_taken || alias_taken)
    }

    fn spawn_background_reanalysis(&self, mapping_id: i64, original_url: String) {
        let store = Arc::clone(&self.store);
        let llm = Arc::clone(&self.llm);

        tokio::spawn(async move {
            let result = llm.analyze(&original_url, None, None).await;

            let Ok(Some(mut mapping)) = store.find_by_id(mapping_id).await else {
                return;
            };
            if mapping.ai_analyzed_at.is_some() {
                return;
            }

            mapping.ai_summary = Some(result.analysis.summary);
            mapping.ai_category = Some(result.analysis.category);
            mapping.ai_tags = Some(result.analysis.tags.join(","));
            mapping.ai_safety_score = Some(result.analysis.safety_score);
            mapping.ai_analyzed_at = Some(Utc::now());

            if let Err(e) = store.update_decorations(&mapping).await {
                tracing::warn!(mapping_id, error = %e, "background re-analysis failed to persist");
            }
        });
    }
}

fn store_err(e: StoreError) -> ApiError {
    match e {
        StoreError::Duplicate => ApiError::DuplicateAlias("short key or alias already exists".into()),
        StoreError::NotFound => ApiError::NotFound("mapping not found".into()),
        other => ApiError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_overrides_apply_to_every_item() {
        let mut overrides = BulkItemOverrides::default();
        overrides.fetch_metadata = Some(false);
        overrides.enable_ai_analysis = Some(false);

        let mut req = CreateRequest {
            original_url: "https://example.com".into(),
            custom_alias: None,
            password: None,
            expires_at: None,
            fetch_metadata: true,
            enable_ai_analysis: true,
            generate_qr_code: false,
            created_by_ip: None,
        };

        if let Some(v) = overrides.fetch_metadata {
            req.fetch_metadata = v;
        }
        if let Some(v) = overrides.enable_ai_analysis {
            req.enable_ai_analysis = v;
        }

        assert!(!req.fetch_metadata);
        assert!(!req.enable_ai_analysis);
    }
}
