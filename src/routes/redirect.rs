//! The redirect path: `GET /{key}` and `POST /{key}/unlock`, the hot
//! path spec.md optimizes around — resolve, redirect, and dispatch
//! click-tracking without blocking the response on it.

use crate::domain::ClickSnapshot;
use crate::errors::ApiError;
use crate::resolver::ResolveState;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[tracing::instrument(name = "redirect", skip(state, headers))]
pub async fn get_redirect(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<RedirectQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    resolve_and_redirect(&state, &key, query.password.as_deref(), peer, &headers).await
}

#[tracing::instrument(name = "unlock", skip(state, headers, body))]
pub async fn post_unlock(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<UnlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    resolve_and_redirect(&state, &key, Some(&body.password), peer, &headers).await
}

async fn resolve_and_redirect(
    state: &AppState,
    key: &str,
    password: Option<&str>,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    match state.resolver.resolve(key, password).await {
        ResolveState::Missing => Err(ApiError::NotFound(format!("no mapping for key '{key}'"))),
        ResolveState::Inactive => Err(ApiError::Inactive("this link has been deactivated".into())),
        ResolveState::Expired => Err(ApiError::Expired("this link has expired".into())),
        ResolveState::NeedsPassword => Err(ApiError::NeedsPassword),
        ResolveState::BadPassword => Err(ApiError::BadPassword),
        ResolveState::Open { original_url, mapping } => {
            let snapshot = ClickSnapshot {
                client_ip: header_str(headers, "x-forwarded-for")
                    .and_then(|xff| xff.split(',').next().map(str::trim).map(str::to_string))
                    .or_else(|| header_str(headers, "x-real-ip"))
                    .unwrap_or_else(|| peer.ip().to_string()),
                user_agent: header_str(headers, "user-agent"),
                referer: header_str(headers, "referer"),
            };
            state.click_tracker.track(mapping.effective_key(), snapshot);

            Ok(Redirect::found(&original_url))
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}
