//! Application startup: database connection and migration, dependency
//! wiring into [`AppState`], router assembly, and graceful shutdown.

use crate::cache::MokaHotCache;
use crate::clicktracker::geoip::GeoIpClient;
use crate::clicktracker::ClickTracker;
use crate::configuration::{DatabaseType, Settings};
use crate::keygen::RandomAlphanumericMinter;
use crate::llm::LlmClient;
use crate::metadata::MetadataFetcher;
use crate::middleware::rate_limit_redirects;
use crate::ratelimit::{DashMapCounterStore, RateLimiter};
use crate::resolver::Resolver;
use crate::routes::{health_check, redirect, urls};
use crate::shortener::Shortener;
use crate::state::AppState;
use crate::store::{AnnotationStore, ClickStore, MappingStore, PostgresStore, SqliteStore};
use crate::telemetry::MakeRequestUuid;
use anyhow::{Context, Result};
use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

const MARK_EXPIRED_INTERVAL_SECS: u64 = 3600;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        // Each backend is erased to its three trait objects directly off
        // the concrete `Arc`, rather than upcast from a single blanket
        // `Arc<dyn Store>` handle, so the erasure doesn't depend on
        // supertrait upcasting being available.
        let (mapping_store, click_store, annotation_store): (
            Arc<dyn MappingStore>,
            Arc<dyn ClickStore>,
            Arc<dyn AnnotationStore>,
        ) = match config.database.r#type {
            DatabaseType::Sqlite => {
                let db = Arc::new(SqliteStore::from_config(&config.database).await?);
                db.migrate().await?;
                (
                    db.clone() as Arc<dyn MappingStore>,
                    db.clone() as Arc<dyn ClickStore>,
                    db as Arc<dyn AnnotationStore>,
                )
            }
            DatabaseType::Postgres => {
                let db = Arc::new(PostgresStore::from_config(&config.database).await?);
                db.migrate().await?;
                (
                    db.clone() as Arc<dyn MappingStore>,
                    db.clone() as Arc<dyn ClickStore>,
                    db as Arc<dyn AnnotationStore>,
                )
            }
        };

        let cache = Arc::new(MokaHotCache::new(
            Duration::from_secs(config.cache.ttl_hours * 3600),
            config.cache.max_entries,
        ));
        let counter_store = Arc::new(DashMapCounterStore::new());
        let rate_limiter = Arc::new(RateLimiter::new(
            counter_store,
            config.rate_limiting.window_seconds,
            config.rate_limiting.max_requests,
        ));
        let minter = Arc::new(RandomAlphanumericMinter);
        let geoip = Arc::new(GeoIpClient::open(config.geoip.database_path.as_deref()));

        let worker_count = 4 * num_cpus::get();
        let click_tracker = Arc::new(ClickTracker::spawn(
            mapping_store.clone(),
            click_store.clone(),
            geoip,
            worker_count,
            worker_count * 64,
        ));

        let llm = Arc::new(LlmClient::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.timeout_secs,
            annotation_store.clone(),
        ));
        let metadata = Arc::new(MetadataFetcher::with_config(
            config.metadata.timeout_secs,
            config.metadata.max_body_bytes as usize,
        ));

        let resolver = Arc::new(Resolver::new(
            mapping_store.clone(),
            cache.clone() as Arc<dyn crate::cache::HotCache>,
        ));

        let shortener = Arc::new(Shortener::new(
            mapping_store.clone(),
            cache.clone() as Arc<dyn crate::cache::HotCache>,
            minter.clone() as Arc<dyn crate::keygen::KeyMinter>,
            metadata.clone(),
            llm.clone(),
            config.application.base_url.clone(),
        ));

        spawn_expiry_sweep(mapping_store.clone());

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)
            .await
            .context("Unable to obtain a TCP listener")?;
        let port = listener.local_addr()?.port();

        let state = AppState {
            mapping_store,
            click_store,
            annotation_store,
            cache,
            rate_limiter,
            minter,
            click_tracker,
            llm,
            metadata,
            shortener,
            resolver,
            config,
        };

        let router = build_router(state);

        Ok(Self { port, listener, router })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        axum::serve(
            self.listener,
            self.router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Unable to start the app server")?;
        Ok(())
    }
}

fn spawn_expiry_sweep(store: Arc<dyn crate::store::MappingStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(MARK_EXPIRED_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match store.mark_expired(Utc::now()).await {
                Ok(count) if count > 0 => tracing::info!(count, "expiry sweep deactivated mappings"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
            }
        }
    });
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true).level(Level::INFO))
        .on_response(DefaultOnResponse::new().include_headers(true));
    let x_request_id = HeaderName::from_static("x-request-id");

    let redirect_routes = Router::new()
        .route("/{key}", get(redirect::get_redirect))
        .route("/{key}/unlock", post(redirect::post_unlock))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_redirects));

    let api_routes = Router::new()
        .route("/api/health_check", get(health_check::health_check))
        .route("/api/urls", post(urls::create_url).get(urls::list_urls))
        .route("/api/urls/bulk", post(urls::create_bulk))
        .route("/api/urls/bulk/csv", post(urls::create_bulk_csv))
        .route("/api/urls/{key}/stats", get(urls::get_stats))
        .route("/api/urls/{key}/analytics", get(urls::get_analytics))
        .route("/api/urls/{key}/qrcode", get(urls::get_qrcode))
        .route("/api/urls/{key}/preview", get(urls::get_preview))
        .route("/api/urls/{key}/protected", get(urls::get_protected));

    Router::new()
        .merge(api_routes)
        .merge(redirect_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(trace_layer)
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}
