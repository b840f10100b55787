//! HTML metadata extraction: Open Graph / Twitter Card / favicon/title
//! fallbacks, for auto-filling link decorations and feeding the LLM
//! prompt with more than a bare URL.

use crate::health_gate::HealthGate;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_TEXT_CHARS: usize = 5000;
const USER_AGENT: &str = "linkshort-bot/1.0 (+metadata fetcher)";
const HEALTH_DECAY_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
    pub page_type: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub canonical: Option<String>,
    pub visible_text: Option<String>,
}

pub struct MetadataFetcher {
    http: reqwest::Client,
    max_body_bytes: usize,
    health: HealthGate,
}

impl MetadataFetcher {
    /// Builds a fetcher honouring the configured timeout and body cap
    /// (spec.md §6's "metadata fetch timeout and body cap" settings).
    pub fn with_config(timeout_secs: u64, max_body_bytes: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            http,
            max_body_bytes,
            health: HealthGate::new(HEALTH_DECAY_SECS),
        }
    }

    pub fn new() -> Self {
        Self::with_config(DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES)
    }

    /// Any failure — network, timeout, non-UTF8 body, oversized body —
    /// degrades to `PageMetadata::default()` rather than propagating an
    /// error: metadata is decoration, never a hard dependency. A target
    /// that has been failing repeatedly trips the health gate, skipping
    /// the network call entirely until it decays back to healthy.
    pub async fn fetch(&self, url: &str) -> PageMetadata {
        if !self.health.is_healthy() {
            tracing::debug!(url, "metadata health gate open, skipping fetch");
            return PageMetadata::default();
        }

        match self.try_fetch(url).await {
            Ok(meta) => {
                self.health.mark_healthy();
                meta
            }
            Err(e) => {
                if matches!(e, MetadataError::Request(_)) {
                    self.health.mark_failed();
                }
                tracing::debug!(url, error = %e, "metadata fetch degraded to defaults");
                PageMetadata::default()
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<PageMetadata, MetadataError> {
        let base = Url::parse(url).map_err(|_| MetadataError::InvalidUrl)?;

        let response = self.http.get(url).send().await.map_err(MetadataError::Request)?;

        if let Some(len) = response.content_length()
            && len as usize > self.max_body_bytes
        {
            return Err(MetadataError::TooLarge);
        }

        let bytes = response.bytes().await.map_err(MetadataError::Request)?;
        if bytes.len() > self.max_body_bytes {
            return Err(MetadataError::TooLarge);
        }

        let body = String::from_utf8_lossy(&bytes[..bytes.len().min(self.max_body_bytes)]);
        Ok(extract(&body, &base))
    }
}

impl Default for MetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
enum MetadataError {
    InvalidUrl,
    TooLarge,
    Request(reqwest::Error),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::InvalidUrl => write!(f, "invalid url"),
            MetadataError::TooLarge => write!(f, "response body exceeded 1MB cap"),
            MetadataError::Request(e) => write!(f, "request failed: {e}"),
        }
    }
}

fn extract(body: &str, base: &Url) -> PageMetadata {
    let doc = Html::parse_document(body);

    let title = meta_content(&doc, "og:title")
        .or_else(|| meta_name(&doc, "twitter:title"))
        .or_else(|| text_of(&doc, "title"));

    let description = meta_content(&doc, "og:description")
        .or_else(|| meta_name(&doc, "twitter:description"))
        .or_else(|| meta_name(&doc, "description"));

    let image = meta_content(&doc, "og:image")
        .or_else(|| meta_name(&doc, "twitter:image"))
        .and_then(|src| resolve(base, &src));

    let favicon = favicon_href(&doc).and_then(|href| resolve(base, &href)).or_else(|| {
        base.join("/favicon.ico").ok().map(|u| u.to_string())
    });

    let site_name = meta_content(&doc, "og:site_name");
    let page_type = meta_content(&doc, "og:type");
    let author = meta_name(&doc, "author");
    let keywords = meta_name(&doc, "keywords");
    let canonical = canonical_href(&doc).and_then(|href| resolve(base, &href));

    let visible_text = visible_text(&doc);

    PageMetadata {
        title,
        description,
        image,
        favicon,
        site_name,
        page_type,
        author,
        keywords,
        canonical,
        visible_text,
    }
}

fn meta_content(doc: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn meta_name(doc: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_of(doc: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn favicon_href(doc: &Html) -> Option<String> {
    let selector = Selector::parse(
        r#"link[rel="icon"], link[rel="shortcut icon"], link[rel="apple-touch-icon"]"#,
    )
    .ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}

fn canonical_href(doc: &Html) -> Option<String> {
    let selector = Selector::parse(r#"link[rel="canonical"]"#).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

fn visible_text(doc: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let text: String = doc
        .select(&selector)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_TEXT_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn extracts_og_tags_in_priority_order() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="OG Title">
                <meta name="twitter:title" content="Twitter Title">
                <title>Fallback Title</title>
                <meta property="og:description" content="OG description text here.">
            </head><body></body></html>
        "#;
        let meta = extract(html, &base());
        assert_eq!(meta.title.as_deref(), Some("OG Title"));
        assert_eq!(meta.description.as_deref(), Some("OG description text here."));
    }

    #[test]
    fn falls_back_to_title_tag_when_no_og_present() {
        let html = r#"<html><head><title>Plain Title</title></head><body></body></html>"#;
        let meta = extract(html, &base());
        assert_eq!(meta.title.as_deref(), Some("Plain Title"));
    }

    #[test]
    fn resolves_relative_favicon_against_base() {
        let html = r#"<html><head><link rel="icon" href="/assets/icon.png"></head><body></body></html>"#;
        let meta = extract(html, &base());
        assert_eq!(meta.favicon.as_deref(), Some("https://example.com/assets/icon.png"));
    }

    #[test]
    fn defaults_favicon_to_well_known_path_when_absent() {
        let html = r#"<html><head></head><body></body></html>"#;
        let meta = extract(html, &base());
        assert_eq!(meta.favicon.as_deref(), Some("https://example.com/favicon.ico"));
    }

    #[test]
    fn visible_text_is_whitespace_collapsed_and_capped() {
        let html = "<html><body><p>Hello   world</p><p>Second paragraph.</p></body></html>";
        let meta = extract(html, &base());
        assert_eq!(meta.visible_text.as_deref(), Some("Hello world Second paragraph."));
    }

    #[tokio::test]
    async fn skips_fetch_when_health_gate_open() {
        let fetcher = MetadataFetcher::new();
        fetcher.health.mark_failed();
        let meta = fetcher.fetch("https://example.com").await;
        assert_eq!(meta.title, None);
    }
}
