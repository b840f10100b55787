//! The `/api/urls` management surface: creation (single, bulk, CSV),
//! listing, stats/analytics, QR codes, and the two gated-link helper
//! endpoints a client needs before it ever calls the redirect path.

use crate::domain::Mapping;
use crate::errors::ApiError;
use crate::response::{ApiResponse, ApiResult};
use crate::shortener::{BulkItemOverrides, CreateRequest, CreateResponse};
use crate::state::AppState;
use crate::store::{ClickAnalytics, ClickStats};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub fetch_metadata: bool,
    #[serde(default = "default_true")]
    pub enable_ai_analysis: bool,
    #[serde(default)]
    pub generate_qr_code: bool,
}

impl CreateUrlRequest {
    fn into_create_request(self, created_by_ip: Option<String>) -> CreateRequest {
        CreateRequest {
            original_url: self.original_url,
            custom_alias: self.custom_alias,
            password: self.password,
            expires_at: self.expires_at,
            fetch_metadata: self.fetch_metadata,
            enable_ai_analysis: self.enable_ai_analysis,
            generate_qr_code: self.generate_qr_code,
            created_by_ip,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub short_key: String,
    pub short_url: String,
    pub original_url: String,
    pub is_password_protected: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub ai_summary: Option<String>,
    pub ai_category: Option<String>,
    pub ai_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_base64: Option<String>,
}

impl UrlResponse {
    fn from_create(response: CreateResponse) -> Self {
        let qr_code_base64 = response
            .generate_qr_code
            .then(|| crate::qrcode::render_png(&response.short_url, None, None, None).ok())
            .flatten()
            .map(|png| base64::engine::general_purpose::STANDARD.encode(png));

        let mapping = response.mapping;
        Self {
            short_key: mapping.effective_key().to_string(),
            short_url: response.short_url,
            original_url: mapping.original_url,
            is_password_protected: mapping.is_password_protected(),
            created_at: mapping.created_at,
            expires_at: mapping.expires_at,
            click_count: mapping.click_count,
            meta_title: mapping.meta_title,
            meta_description: mapping.meta_description,
            ai_summary: mapping.ai_summary,
            ai_category: mapping.ai_category,
            ai_tags: mapping.ai_tags_vec(),
            qr_code_base64,
        }
    }
}

fn client_ip_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
}

#[tracing::instrument(name = "create url", skip(state, headers, request))]
pub async fn create_url(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(request): Json<CreateUrlRequest>,
) -> Result<Response, ApiError> {
    let created_by_ip = client_ip_from_headers(&headers);
    let response = state
        .shortener
        .create(request.into_create_request(created_by_ip))
        .await?;

    let body = ApiResponse::success_with_status(StatusCode::CREATED, UrlResponse::from_create(response));
    Ok(body.into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateRequest {
    pub urls: Vec<CreateUrlRequest>,
    #[serde(default)]
    pub fetch_metadata: Option<bool>,
    #[serde(default)]
    pub enable_ai_analysis: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateError {
    pub index: usize,
    pub original_url: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResponse {
    pub success_count: usize,
    pub failed_count: usize,
    pub urls: Vec<UrlResponse>,
    pub errors: Vec<BulkCreateError>,
}

#[tracing::instrument(name = "create bulk urls", skip(state, headers, request))]
pub async fn create_bulk(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(request): Json<BulkCreateRequest>,
) -> Result<Response, ApiError> {
    let created_by_ip = client_ip_from_headers(&headers);
    let requests: Vec<CreateRequest> = request
        .urls
        .into_iter()
        .map(|r| r.into_create_request(created_by_ip.clone()))
        .collect();

    let overrides = BulkItemOverrides {
        fetch_metadata: request.fetch_metadata,
        enable_ai_analysis: request.enable_ai_analysis,
    };

    let (successes, failures) = state.shortener.create_bulk(requests, overrides).await;
    Ok(bulk_response(successes, failures).into_response())
}

#[tracing::instrument(name = "create bulk urls from csv", skip(state, headers, multipart))]
pub async fn create_bulk_csv(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::ValidationFailure(format!("malformed multipart upload: {e}")))?
    {
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::ValidationFailure(format!("could not read upload: {e}")))?;
        bytes = Some(data.to_vec());
        break;
    }

    let bytes = bytes.ok_or_else(|| ApiError::ValidationFailure("no file field in upload".into()))?;
    let urls = crate::bulk_csv::parse_urls(&bytes).map_err(|e| ApiError::ValidationFailure(e.0))?;

    if urls.is_empty() {
        return Err(ApiError::ValidationFailure("no valid URLs found in upload".into()));
    }

    let created_by_ip = client_ip_from_headers(&headers);
    let requests: Vec<CreateRequest> = urls
        .into_iter()
        .map(|original_url| CreateRequest {
            original_url,
            custom_alias: None,
            password: None,
            expires_at: None,
            fetch_metadata: true,
            enable_ai_analysis: true,
            generate_qr_code: false,
            created_by_ip: created_by_ip.clone(),
        })
        .collect();

    let (successes, failures) = state.shortener.create_bulk(requests, BulkItemOverrides::default()).await;
    Ok(bulk_response(successes, failures).into_response())
}

fn bulk_response(
    successes: Vec<CreateResponse>,
    failures: Vec<crate::shortener::BulkFailure>,
) -> ApiResponse<BulkCreateResponse> {
    let success_count = successes.len();
    let failed_count = failures.len();
    let data = BulkCreateResponse {
        success_count,
        failed_count,
        urls: successes.into_iter().map(UrlResponse::from_create).collect(),
        errors: failures
            .into_iter()
            .map(|f| BulkCreateError {
                index: f.index,
                original_url: f.original_url,
                error: f.error_message,
            })
            .collect(),
    };
    ApiResponse::success_with_status(StatusCode::CREATED, data)
}

#[tracing::instrument(name = "list urls", skip(state))]
pub async fn list_urls(State(state): State<AppState>) -> ApiResult<Vec<UrlResponse>> {
    let mappings = state
        .mapping_store
        .list_recent(20)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let urls = mappings
        .into_iter()
        .map(|mapping| mapping_to_response(&state, mapping))
        .collect();

    Ok(ApiResponse::success(urls))
}

fn mapping_to_response(state: &AppState, mapping: Mapping) -> UrlResponse {
    let short_url = format!(
        "{}/{}",
        state.config.application.base_url.trim_end_matches('/'),
        mapping.effective_key()
    );
    UrlResponse {
        short_key: mapping.effective_key().to_string(),
        short_url,
        original_url: mapping.original_url,
        is_password_protected: mapping.is_password_protected(),
        created_at: mapping.created_at,
        expires_at: mapping.expires_at,
        click_count: mapping.click_count,
        meta_title: mapping.meta_title,
        meta_description: mapping.meta_description,
        ai_summary: mapping.ai_summary,
        ai_category: mapping.ai_category,
        ai_tags: mapping.ai_tags_vec(),
        qr_code_base64: None,
    }
}

async fn lookup_mapping(state: &AppState, key: &str) -> Result<Mapping, ApiError> {
    state
        .mapping_store
        .find_by_effective_key(key)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("no mapping for key '{key}'")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub short_key: String,
    pub total_clicks: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

#[tracing::instrument(name = "url stats", skip(state))]
pub async fn get_stats(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<StatsResponse> {
    let mapping = lookup_mapping(&state, &key).await?;
    let ClickStats { total_clicks, last_clicked_at } = state
        .click_store
        .stats(mapping.id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(ApiResponse::success(StatsResponse {
        short_key: mapping.effective_key().to_string(),
        total_clicks,
        last_clicked_at,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub short_key: String,
    pub by_country: Vec<BreakdownEntry>,
    pub by_device: Vec<BreakdownEntry>,
    pub by_browser: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize)]
pub struct BreakdownEntry {
    pub key: String,
    pub count: i64,
}

fn breakdown(pairs: Vec<(String, i64)>) -> Vec<BreakdownEntry> {
    pairs.into_iter().map(|(key, count)| BreakdownEntry { key, count }).collect()
}

#[tracing::instrument(name = "url analytics", skip(state))]
pub async fn get_analytics(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<AnalyticsResponse> {
    let mapping = lookup_mapping(&state, &key).await?;
    let ClickAnalytics { by_country, by_device, by_browser } = state
        .click_store
        .analytics(mapping.id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(ApiResponse::success(AnalyticsResponse {
        short_key: mapping.effective_key().to_string(),
        by_country: breakdown(by_country),
        by_device: breakdown(by_device),
        by_browser: breakdown(by_browser),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeQuery {
    pub size: Option<u32>,
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
}

fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some([r, g, b])
}

#[tracing::instrument(name = "url qrcode", skip(state))]
pub async fn get_qrcode(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<QrCodeQuery>,
) -> Result<Response, ApiError> {
    let mapping = lookup_mapping(&state, &key).await?;
    let short_url = format!(
        "{}/{}",
        state.config.application.base_url.trim_end_matches('/'),
        mapping.effective_key()
    );

    let fg = query.fg_color.as_deref().and_then(parse_hex_color);
    let bg = query.bg_color.as_deref().and_then(parse_hex_color);
    let png = crate::qrcode::render_png(&short_url, query.size, fg, bg)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        png,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub short_key: String,
    pub is_password_protected: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_image_url: Option<String>,
    pub ai_summary: Option<String>,
    pub ai_category: Option<String>,
    pub ai_tags: Vec<String>,
}

#[tracing::instrument(name = "url preview", skip(state))]
pub async fn get_preview(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<PreviewResponse> {
    let mapping = lookup_mapping(&state, &key).await?;
    Ok(ApiResponse::success(PreviewResponse {
        short_key: mapping.effective_key().to_string(),
        is_password_protected: mapping.is_password_protected(),
        meta_title: mapping.meta_title,
        meta_description: mapping.meta_description,
        meta_image_url: mapping.meta_image_url,
        ai_summary: mapping.ai_summary,
        ai_category: mapping.ai_category,
        ai_tags: mapping.ai_tags_vec(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResponse {
    pub password_required: bool,
}

#[tracing::instrument(name = "url protected", skip(state))]
pub async fn get_protected(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<ProtectedResponse> {
    let mapping = lookup_mapping(&state, &key).await?;
    Ok(ApiResponse::success(ProtectedResponse {
        password_required: mapping.is_password_protected(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors_with_and_without_hash() {
        assert_eq!(parse_hex_color("#ff0000"), Some([255, 0, 0]));
        assert_eq!(parse_hex_color("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("nope"), None);
        assert_eq!(parse_hex_color("#ff00"), None);
    }
}
