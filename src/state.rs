//! Shared application state: trait-object handles to every subsystem
//! behind `Arc`, injected into handlers via Axum's `State` extractor.

use crate::cache::HotCache;
use crate::clicktracker::ClickTracker;
use crate::configuration::Settings;
use crate::keygen::KeyMinter;
use crate::llm::LlmClient;
use crate::metadata::MetadataFetcher;
use crate::ratelimit::RateLimiter;
use crate::resolver::Resolver;
use crate::shortener::Shortener;
use crate::store::{AnnotationStore, ClickStore, MappingStore};
use axum_macros::FromRef;
use std::sync::Arc;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub mapping_store: Arc<dyn MappingStore>,
    pub click_store: Arc<dyn ClickStore>,
    pub annotation_store: Arc<dyn AnnotationStore>,
    pub cache: Arc<dyn HotCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub minter: Arc<dyn KeyMinter>,
    pub click_tracker: Arc<ClickTracker>,
    pub llm: Arc<LlmClient>,
    pub metadata: Arc<MetadataFetcher>,
    pub shortener: Arc<Shortener>,
    pub resolver: Arc<Resolver>,
    pub config: Settings,
}
