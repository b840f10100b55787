//! AI enrichment: summary/category/tags/safety via a local OpenAI-style
//! chat-completions endpoint, guarded by a circuit-breaker health gate
//! and cached by `SHA-256(original_url)` in the AnnotationStore.

mod parse;
mod sanitize;

use crate::domain::{Annotation, AnnotationResult, LlmAnalysis, CATEGORY_TAXONOMY};
use crate::health_gate::HealthGate;
use crate::store::AnnotationStore;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration as StdDuration;

const ANNOTATION_TTL_DAYS: i64 = 7;
const HEALTH_PROBE_TIMEOUT_SECS: u64 = 5;
const HEALTH_DECAY_SECS: u64 = 30;
const MAX_RETRIES: u32 = 2;

fn neutral_default(url_hash: &str, original_url: &str) -> Annotation {
    let now = Utc::now();
    Annotation {
        url_hash: url_hash.to_string(),
        original_url: original_url.to_string(),
        summary: String::new(),
        category: "Other".to_string(),
        tags: String::new(),
        safety_score: 0.8,
        is_safe: true,
        safety_reasons: String::new(),
        analyzed_at: now,
        expires_at: now,
    }
}

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    health: HealthGate,
    annotation_store: Arc<dyn AnnotationStore>,
}

impl LlmClient {
    pub fn new(
        base_url: String,
        model: String,
        completion_timeout_secs: u64,
        annotation_store: Arc<dyn AnnotationStore>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(completion_timeout_secs))
            .build()
            .expect("reqwest client builds with static config");

        Self {
            http,
            base_url,
            model,
            health: HealthGate::new(HEALTH_DECAY_SECS),
            annotation_store,
        }
    }

    pub async fn analyze(&self, url: &str, title: Option<&str>, description: Option<&str>) -> AnnotationResult {
        let url_hash = hex::encode(Sha256::digest(url.as_bytes()));

        match self.annotation_store.find(&url_hash).await {
            Ok(Some(cached)) if !cached.is_expired(Utc::now()) => {
                return AnnotationResult {
                    analysis: to_analysis(&cached),
                    from_cache: true,
                };
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "annotation cache lookup failed, proceeding uncached");
            }
        }

        if !self.health.is_healthy() {
            tracing::debug!(url, "llm health gate open, returning neutral default");
            return AnnotationResult {
                analysis: to_analysis(&neutral_default(&url_hash, url)),
                from_cache: false,
            };
        }

        let prompt = build_prompt(url, title, description);

        let analysis = match self.complete_with_retry(&prompt).await {
            Ok(raw_text) => {
                self.health.mark_healthy();
                sanitize_analysis(parse::parse_response(&raw_text))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "llm completion failed, returning neutral default");
                self.health.mark_failed();
                return AnnotationResult {
                    analysis: to_analysis(&neutral_default(&url_hash, url)),
                    from_cache: false,
                };
            }
        };

        let now = Utc::now();
        let annotation = Annotation {
            url_hash: url_hash.clone(),
            original_url: url.to_string(),
            summary: analysis.summary.clone(),
            category: analysis.category.clone(),
            tags: analysis.tags.join(","),
            safety_score: analysis.safety_score,
            is_safe: analysis.is_safe,
            safety_reasons: analysis.safety_reasons.join(","),
            analyzed_at: now,
            expires_at: now + Duration::days(ANNOTATION_TTL_DAYS),
        };

        if let Err(e) = self.annotation_store.upsert(&annotation).await {
            tracing::warn!(url, error = %e, "failed to persist annotation");
        }

        AnnotationResult {
            analysis,
            from_cache: false,
        }
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let mut attempt = 0;
        loop {
            match self.complete_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_timeout() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::debug!(attempt, "llm completion timed out, retrying");
                    tokio::time::sleep(StdDuration::from_secs(1)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "top_p": 0.9,
            "max_tokens": 1000,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value: serde_json::Value = response.json().await?;
        let text = value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Ok(text)
    }

    /// Dedicated health probe (`GET /api/tags`), per spec.md §4.10.
    pub async fn probe_health(&self) -> bool {
        let probed = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(StdDuration::from_secs(HEALTH_PROBE_TIMEOUT_SECS))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);

        if probed {
            self.health.mark_healthy();
        } else {
            self.health.mark_failed();
        }
        probed
    }
}

fn build_prompt(url: &str, title: Option<&str>, description: Option<&str>) -> String {
    let taxonomy = CATEGORY_TAXONOMY.join(", ");
    format!(
        "Analyze the following URL and respond with a single JSON object only, \
         no markdown, no commentary. The object must have exactly these keys: \
         summary (string), category (one of: {taxonomy}), tags (array of strings), \
         safety_score (number 0 to 1), is_safe (boolean), safety_reasons (array of strings), \
         alias_suggestions (array of short URL-slug strings).\n\n\
         URL: {url}\nTitle: {title}\nDescription: {description}",
        title = title.unwrap_or(""),
        description = description.unwrap_or(""),
    )
}

fn sanitize_analysis(raw: LlmAnalysis) -> LlmAnalysis {
    LlmAnalysis {
        summary: sanitize::sanitize_summary(&raw.summary),
        category: sanitize::sanitize_category(&raw.category),
        tags: sanitize::sanitize_tags(raw.tags),
        safety_score: sanitize::clamp_safety_score(Some(raw.safety_score)),
        is_safe: raw.is_safe,
        safety_reasons: sanitize::sanitize_safety_reasons(raw.safety_reasons),
        alias_suggestions: sanitize::sanitize_alias_suggestions(raw.alias_suggestions),
    }
}

fn to_analysis(annotation: &Annotation) -> LlmAnalysis {
    LlmAnalysis {
        summary: annotation.summary.clone(),
        category: annotation.category.clone(),
        tags: annotation.tags_vec(),
        safety_score: annotation.safety_score,
        is_safe: annotation.is_safe,
        safety_reasons: annotation.safety_reasons_vec(),
        alias_suggestions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_url_and_taxonomy() {
        let prompt = build_prompt("https://example.com", Some("Example"), None);
        assert!(prompt.contains("https://example.com"));
        assert!(prompt.contains("Technology"));
    }

    #[test]
    fn neutral_default_matches_spec_values() {
        let a = neutral_default("hash", "https://example.com");
        assert_eq!(a.category, "Other");
        assert_eq!(a.safety_score, 0.8);
        assert!(a.is_safe);
        assert!(a.tags_vec().is_empty());
    }
}
