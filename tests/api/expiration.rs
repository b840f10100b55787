use crate::helpers::{plain_create_body, spawn_app};
use chrono::{Duration, Utc};
use serde_json::Value;

#[tokio::test]
async fn a_link_past_its_expiry_is_gone() {
    let app = spawn_app().await;

    let mut body = plain_create_body("https://example.com/expired");
    body["expiresAt"] = (Utc::now() - Duration::hours(1)).to_rfc3339().into();
    let response = app.create_url(body).await;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let created: Value = response.json().await.expect("response was not valid JSON");
    let short_key = created["data"]["shortKey"].as_str().unwrap().to_string();

    let redirect = app.get_redirect(&short_key).await;
    assert_eq!(redirect.status(), reqwest::StatusCode::GONE);
}

#[tokio::test]
async fn a_link_with_a_future_expiry_still_redirects() {
    let app = spawn_app().await;

    let mut body = plain_create_body("https://example.com/not-yet-expired");
    body["expiresAt"] = (Utc::now() + Duration::hours(1)).to_rfc3339().into();
    let response = app.create_url(body).await;
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let created: Value = response.json().await.expect("response was not valid JSON");
    let short_key = created["data"]["shortKey"].as_str().unwrap().to_string();

    let redirect = app.get_redirect(&short_key).await;
    assert_eq!(redirect.status(), reqwest::StatusCode::FOUND);
}
